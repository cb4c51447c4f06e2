//! Closed table of the Jamf object types this crate knows how to address

use super::constants::CLASSIC_PREFIX;
use crate::error::JamfError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which of the two Jamf APIs an endpoint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiFamily {
    /// Legacy XML API under `/JSSResource`
    Classic,
    /// JSON API under `/api`
    JamfPro,
}

impl ApiFamily {
    pub fn media_type(&self) -> &'static str {
        match self {
            ApiFamily::Classic => super::constants::headers::CONTENT_TYPE_XML,
            ApiFamily::JamfPro => super::constants::headers::CONTENT_TYPE_JSON,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    AdvancedComputerSearch,
    ComputerExtensionAttribute,
    ComputerGroup,
    DockItem,
    MacApplication,
    MobileDeviceGroup,
    MobileDeviceProfile,
    OsXConfigurationProfile,
    PatchPolicy,
    PatchSoftwareTitle,
    Policy,
    RestrictedSoftware,
    ApiClient,
    ApiRole,
    Category,
    Icon,
    Package,
    Script,
}

impl ObjectType {
    pub const ALL: [ObjectType; 18] = [
        ObjectType::AdvancedComputerSearch,
        ObjectType::ComputerExtensionAttribute,
        ObjectType::ComputerGroup,
        ObjectType::DockItem,
        ObjectType::MacApplication,
        ObjectType::MobileDeviceGroup,
        ObjectType::MobileDeviceProfile,
        ObjectType::OsXConfigurationProfile,
        ObjectType::PatchPolicy,
        ObjectType::PatchSoftwareTitle,
        ObjectType::Policy,
        ObjectType::RestrictedSoftware,
        ObjectType::ApiClient,
        ObjectType::ApiRole,
        ObjectType::Category,
        ObjectType::Icon,
        ObjectType::Package,
        ObjectType::Script,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::AdvancedComputerSearch => "advanced_computer_search",
            ObjectType::ComputerExtensionAttribute => "computer_extension_attribute",
            ObjectType::ComputerGroup => "computer_group",
            ObjectType::DockItem => "dock_item",
            ObjectType::MacApplication => "mac_application",
            ObjectType::MobileDeviceGroup => "mobile_device_group",
            ObjectType::MobileDeviceProfile => "mobile_device_profile",
            ObjectType::OsXConfigurationProfile => "os_x_configuration_profile",
            ObjectType::PatchPolicy => "patch_policy",
            ObjectType::PatchSoftwareTitle => "patch_software_title",
            ObjectType::Policy => "policy",
            ObjectType::RestrictedSoftware => "restricted_software",
            ObjectType::ApiClient => "api_client",
            ObjectType::ApiRole => "api_role",
            ObjectType::Category => "category",
            ObjectType::Icon => "icon",
            ObjectType::Package => "package",
            ObjectType::Script => "script",
        }
    }

    pub fn family(&self) -> ApiFamily {
        match self {
            ObjectType::ApiClient
            | ObjectType::ApiRole
            | ObjectType::Category
            | ObjectType::Icon
            | ObjectType::Package
            | ObjectType::Script => ApiFamily::JamfPro,
            _ => ApiFamily::Classic,
        }
    }

    /// Endpoint path relative to the server URL, without an id
    pub fn path(&self) -> String {
        match self {
            ObjectType::ApiClient => "api/v1/api-integrations".to_string(),
            ObjectType::ApiRole => "api/v1/api-roles".to_string(),
            ObjectType::Category => "api/v1/categories".to_string(),
            ObjectType::Icon => "api/v1/icon".to_string(),
            ObjectType::Package => "api/v1/packages".to_string(),
            ObjectType::Script => "api/v1/scripts".to_string(),
            classic => format!("{}/{}", CLASSIC_PREFIX, classic.classic_resource()),
        }
    }

    fn classic_resource(&self) -> &'static str {
        match self {
            ObjectType::AdvancedComputerSearch => "advancedcomputersearches",
            ObjectType::ComputerExtensionAttribute => "computerextensionattributes",
            ObjectType::ComputerGroup => "computergroups",
            ObjectType::DockItem => "dockitems",
            ObjectType::MacApplication => "macapplications",
            ObjectType::MobileDeviceGroup => "mobiledevicegroups",
            ObjectType::MobileDeviceProfile => "mobiledeviceconfigurationprofiles",
            ObjectType::OsXConfigurationProfile => "osxconfigurationprofiles",
            ObjectType::PatchPolicy => "patchpolicies",
            ObjectType::PatchSoftwareTitle => "patchsoftwaretitles",
            ObjectType::Policy => "policies",
            ObjectType::RestrictedSoftware => "restrictedsoftware",
            _ => "",
        }
    }

    /// Key of the array in a Classic JSON listing
    pub fn classic_list_key(&self) -> Option<&'static str> {
        match self {
            ObjectType::AdvancedComputerSearch => Some("advanced_computer_searches"),
            ObjectType::ComputerExtensionAttribute => Some("computer_extension_attributes"),
            ObjectType::ComputerGroup => Some("computer_groups"),
            ObjectType::DockItem => Some("dock_items"),
            ObjectType::MacApplication => Some("mac_applications"),
            ObjectType::MobileDeviceGroup => Some("mobile_device_groups"),
            ObjectType::MobileDeviceProfile => Some("configuration_profiles"),
            ObjectType::OsXConfigurationProfile => Some("os_x_configuration_profiles"),
            ObjectType::PatchPolicy => Some("patch_policies"),
            ObjectType::PatchSoftwareTitle => Some("patch_software_titles"),
            ObjectType::Policy => Some("policies"),
            ObjectType::RestrictedSoftware => Some("restricted_software"),
            _ => None,
        }
    }

    /// Field a Jamf Pro listing is filtered and matched on
    pub fn lookup_key(&self) -> Option<&'static str> {
        match self {
            ObjectType::ApiClient | ObjectType::ApiRole => Some("displayName"),
            ObjectType::Category | ObjectType::Script => Some("name"),
            ObjectType::Package => Some("packageName"),
            ObjectType::Icon => None,
            _ => Some("name"),
        }
    }

    /// Root element of a Classic XML document for this type
    pub fn xml_root(&self) -> Option<&'static str> {
        match self {
            ObjectType::AdvancedComputerSearch => Some("advanced_computer_search"),
            ObjectType::ComputerExtensionAttribute => Some("computer_extension_attribute"),
            ObjectType::ComputerGroup => Some("computer_group"),
            ObjectType::DockItem => Some("dock_item"),
            ObjectType::MacApplication => Some("mac_application"),
            ObjectType::MobileDeviceGroup => Some("mobile_device_group"),
            ObjectType::MobileDeviceProfile => Some("configuration_profile"),
            ObjectType::OsXConfigurationProfile => Some("os_x_configuration_profile"),
            ObjectType::PatchPolicy => Some("patch_policy"),
            ObjectType::PatchSoftwareTitle => Some("patch_software_title"),
            ObjectType::Policy => Some("policy"),
            ObjectType::RestrictedSoftware => Some("restricted_software"),
            _ => None,
        }
    }

    /// Listing endpoint used to resolve names to ids
    pub fn list_path(&self) -> String {
        self.path()
    }

    /// Endpoint a new object is POSTed to. Patch policies are created under
    /// their software title instead, see [`patch_policy_create_path`].
    pub fn create_path(&self) -> String {
        match self.family() {
            ApiFamily::Classic => format!("{}/id/0", self.path()),
            ApiFamily::JamfPro => self.path(),
        }
    }

    /// Endpoint addressing one existing object
    pub fn object_path(&self, id: &str) -> String {
        match self.family() {
            ApiFamily::Classic => format!("{}/id/{}", self.path(), id),
            ApiFamily::JamfPro => format!("{}/{}", self.path(), id),
        }
    }
}

/// Classic endpoint creating a patch policy for one software title
pub fn patch_policy_create_path(title_id: &str) -> String {
    format!(
        "{}/softwaretitleconfig/id/{}",
        ObjectType::PatchPolicy.path(),
        title_id
    )
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = JamfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        ObjectType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| JamfError::invalid("object_type", format!("unknown object type '{}'", s)))
    }
}
