//! Double-buffered multi-attachment render targets.
//!
//! Two groups of up to [`MAX_ATTACHMENTS`] attachments alternate between the
//! `data` (read) and `utility` (write) roles. Drawing happens into `utility`
//! inside a pass; [`MultiTarget::swap`] flips the roles and refreshes the
//! readback mirrors from the new `data` group.

mod config;
mod error;
mod format;
mod group;
mod multi;
mod pass;

pub use config::{resolve_attachments, AttachmentSpec, TargetConfig};
pub use error::TargetError;
pub use format::{FormatInfo, Repr};
pub use group::{Attachment, GroupId, Roles, TargetGroup};
pub use multi::MultiTarget;
pub use pass::{ActiveSet, PassState, Transition};

/// Upper bound on attachments per group.
pub const MAX_ATTACHMENTS: usize = 7;
