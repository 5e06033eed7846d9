//! # Access Control
//!
//! Guest identity numbers are PII. They are always shown masked; the clear
//! value needs a [`PiiCapability`], which only an [`AccessContext`] with a
//! sufficient permission level can mint.
//!
//! ```text
//!   AccessContext { level: 1 } ──pii_capability()──► Err(PermissionDenied)
//!   AccessContext { level: 2 } ──pii_capability()──► Ok(PiiCapability)
//!                                                        │
//!   guest.reveal_id_number(&cap) ◄───────────────────────┘
//!   guest.masked_id_number()      → "XXXX-XXXX-1234"  (no capability needed)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{Booking, GuestDetails};
use crate::PII_REVEAL_LEVEL;

const MASK_PREFIX: &str = "XXXX-XXXX-";

/// Who is acting, and at what permission level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessContext {
    pub user: String,
    pub level: u8,
}

impl AccessContext {
    pub fn new(user: impl Into<String>, level: u8) -> Self {
        AccessContext {
            user: user.into(),
            level,
        }
    }

    /// Front-desk clerk without PII rights.
    pub fn clerk(user: impl Into<String>) -> Self {
        Self::new(user, 1)
    }

    pub fn can_view_pii(&self) -> bool {
        self.level >= PII_REVEAL_LEVEL
    }

    /// Mints the capability to read clear identity numbers.
    pub fn pii_capability(&self) -> CoreResult<PiiCapability> {
        if !self.can_view_pii() {
            return Err(CoreError::PermissionDenied {
                action: "view unmasked PII".to_string(),
                required: PII_REVEAL_LEVEL,
            });
        }
        Ok(PiiCapability { _private: () })
    }
}

/// Proof that the caller may read unmasked PII. Only
/// [`AccessContext::pii_capability`] constructs one.
#[derive(Debug)]
pub struct PiiCapability {
    _private: (),
}

fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("{}{}", MASK_PREFIX, tail)
}

impl GuestDetails {
    /// `XXXX-XXXX-` followed by the last four characters.
    pub fn masked_id_number(&self) -> Option<String> {
        self.id_number.as_deref().filter(|s| !s.is_empty()).map(mask)
    }

    pub fn reveal_id_number(&self, _capability: &PiiCapability) -> Option<&str> {
        self.id_number.as_deref()
    }

    /// A copy whose identity number is masked.
    pub fn masked(&self) -> GuestDetails {
        GuestDetails {
            id_number: self.masked_id_number(),
            ..self.clone()
        }
    }

    /// Undoes a masked round trip: when a client sends back the masked
    /// form it received, keep the stored clear value.
    pub fn restore_masked_id(&mut self, previous: Option<&GuestDetails>) {
        let is_masked = self
            .id_number
            .as_deref()
            .is_some_and(|s| s.starts_with(MASK_PREFIX));
        if is_masked {
            self.id_number = previous.and_then(|p| p.id_number.clone());
        }
    }
}

impl Booking {
    /// A copy safe to show without a [`PiiCapability`].
    pub fn redacted(&self) -> Booking {
        Booking {
            guest_details: self.guest_details.as_ref().map(GuestDetails::masked),
            accessory_guests: self.accessory_guests.iter().map(GuestDetails::masked).collect(),
            ..self.clone()
        }
    }

    /// Restores clear identity numbers that a client echoed back masked.
    pub fn restore_masked_ids(&mut self, previous: &Booking) {
        if let Some(details) = self.guest_details.as_mut() {
            details.restore_masked_id(previous.guest_details.as_ref());
        }
        for (idx, guest) in self.accessory_guests.iter_mut().enumerate() {
            guest.restore_masked_id(previous.accessory_guests.get(idx));
        }
    }
}
