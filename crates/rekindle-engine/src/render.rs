// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message rendering seam.
//!
//! The core never composes outreach copy; a collaborator turns a
//! `(message_type, variant)` pair into the text a channel provider delivers.
//! [`CannedRenderer`] ships neutral placeholder copy so the engine runs
//! end to end without the production rendering service.

use rekindle_core::types::Channel;

/// Produces the outbound text for a step.
pub trait MessageRenderer: Send + Sync + 'static {
    fn render(&self, lead_id: &str, channel: Channel, message_type: &str, variant: &str)
    -> String;
}

/// Placeholder renderer used by the bundled binary and tests.
pub struct CannedRenderer;

impl MessageRenderer for CannedRenderer {
    fn render(
        &self,
        _lead_id: &str,
        _channel: Channel,
        message_type: &str,
        variant: &str,
    ) -> String {
        match message_type {
            "intro" | "intro_detail" | "revival_intro" | "nurture_intro" => {
                "Hi! Thanks for your interest -- when works for a quick look?".to_string()
            }
            "check_in" | "nudge" | "revival_nudge" | "nurture_check_in" | "follow_up_call" => {
                "Just checking in. Still interested in seeing the place?".to_string()
            }
            "value_prop" | "listing_update" | "market_update" | "final_value"
            | "revival_value" | "nurture_content" => {
                "A few similar homes in the area just listed. Want the details?".to_string()
            }
            "breakup" | "breakup_drop" => {
                "I'll stop reaching out for now. Reply any time and we'll pick it back up."
                    .to_string()
            }
            "intro_call" | "voicemail_drop" => {
                "Hi, this is your agent following up on the listing you asked about.".to_string()
            }
            other => format!("[{other}/{variant}]"),
        }
    }
}
