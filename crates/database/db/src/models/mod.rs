/// This module contains the anchoring database model.
pub mod anchoring;

/// This module contains the message database model.
pub mod message;

/// This module contains the watermark database model.
pub mod watermark;
