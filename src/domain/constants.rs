//! Ad frame constants
//!
//! Fixed values shared by the frame script and the parent page. Anything a
//! deployment may want to tune lives in `AdServingSettings` instead.

/// Cross-frame event and command names understood by the parent page
pub mod messaging {
    /// Sent once per frame load, before any result is known
    pub const REQUEST_EVENT: &str = "request.adzerk";

    /// Sent once per served ad
    pub const RESPONSE_EVENT: &str = "response.adzerk";

    /// Prefix of the companion frame commands (`ados.createAdFrame:top`)
    pub const CREATE_AD_FRAME_PREFIX: &str = "ados.createAdFrame:";

    /// Response payloads name placements `banner_<key>`
    pub const PLACEMENT_NAME_PREFIX: &str = "banner_";
}

/// Fragment config field values with special meaning
pub mod fragment {
    /// Property flagging the double-sidebar experiment
    pub const DOUBLE_SIDEBAR_PROPERTY: &str = "double_sidebar";

    /// Property naming the frame that rendered the request
    pub const FRAME_ID_PROPERTY: &str = "frame_id";

    /// Property used by the yield manager for percentage-based SSP targeting
    pub const PERCENTAGE_PROPERTY: &str = "percentage";

    /// Property with the account age, forwarded in instrumented payloads
    pub const AGE_HOURS_PROPERTY: &str = "age_hours";

    /// Firefox percent-encodes the fragment, other browsers do not
    pub const ENCODED_OBJECT_SIGNATURE: &str = "{%22";

    /// Frame id of the top frame in the double-sidebar layout
    pub const TOP_FRAME_ID: &str = "ad_main_top";
}

/// Slot and frame naming inside the frame document
pub mod frame {
    /// Element that receives the main ad or the fallback image
    pub const MAIN_SLOT: &str = "main";

    /// Window name prefix (`ad-top`) used by the delegate frame
    pub const WINDOW_NAME_PREFIX: &str = "ad-";

    /// Static document that bootstraps a companion frame without postMessage
    pub const DEFAULT_BOOTSTRAP_SRC: &str = "/static/createadframe.html";

    pub const FALLBACK_IMAGE_WIDTH: u32 = 300;
    pub const FALLBACK_IMAGE_HEIGHT: u32 = 250;
}

/// Delivery zone names looked up in the zone table
pub mod zones {
    pub const ABOVE_THE_FOLD: &str = "above_the_fold";
    pub const BELOW_THE_FOLD: &str = "below_the_fold";
}

/// Result polling
pub mod polling {
    /// Interval between checks of the library's result flag
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
}
