// ── Variant-specific fields ──
//
// Free-text and linkage fields that only one concrete record kind carries.

use serde::{Deserialize, Serialize};

/// Person-specific fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserFields {
    pub surname: Option<String>,
    pub middle_name: Option<String>,
    pub given_name: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub nickname: Option<String>,
    pub tag7: Option<String>,
    pub tag8: Option<String>,
    pub tag9: Option<String>,
    pub(crate) associated_login_id: Option<i64>,
}

impl UserFields {
    /// ID of the login (security database) associated with this user.
    pub fn associated_login_id(&self) -> Option<i64> {
        self.associated_login_id
    }
}

/// Structured postal address of a place.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressElements {
    pub venue: Option<String>,
    pub street_address: Option<String>,
    pub extra_information: Option<String>,
    pub town: Option<String>,
    pub county: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub nation: Option<String>,
}

impl AddressElements {
    /// `(wire name, value)` pairs in a fixed order.
    pub fn entries(&self) -> [(&'static str, Option<&str>); 8] {
        [
            ("venue", self.venue.as_deref()),
            ("street_address", self.street_address.as_deref()),
            ("extra_information", self.extra_information.as_deref()),
            ("town", self.town.as_deref()),
            ("county", self.county.as_deref()),
            ("state", self.state.as_deref()),
            ("postal_code", self.postal_code.as_deref()),
            ("nation", self.nation.as_deref()),
        ]
    }
}

/// Place-specific fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaceFields {
    pub address: AddressElements,
    pub tag8: Option<String>,
    pub tag9: Option<String>,
}

/// Thing-specific fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThingFields {
    /// Alternate unique string key.
    pub key: Option<String>,
    pub description: Option<String>,
    pub tag2: Option<String>,
    pub tag3: Option<String>,
    pub tag4: Option<String>,
    pub tag5: Option<String>,
    pub tag6: Option<String>,
    pub tag7: Option<String>,
    pub tag8: Option<String>,
    pub tag9: Option<String>,
}
