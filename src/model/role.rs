use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Hr,
    Manager,
    Employee,
}

impl Role {
    /// Admin, HR and managers may read the monitoring/reporting views.
    pub fn is_management(self) -> bool {
        matches!(self, Role::Admin | Role::Hr | Role::Manager)
    }
}
