//! Permission codenames and access checks.
//!
//! Permissions are `app.codename` strings granted per user. Superusers hold
//! every permission implicitly. Standard model permissions follow the
//! `view_/add_/change_/delete_<model>` convention and are grouped in
//! [`ModelPerms`] constants.

use std::collections::HashSet;

/// The four standard permissions of a resource.
#[derive(Debug, Clone, Copy)]
pub struct ModelPerms {
    pub view: &'static str,
    pub add: &'static str,
    pub change: &'static str,
    pub delete: &'static str,
}

macro_rules! model_perms {
    ($name:ident, $app:literal, $model:literal) => {
        pub const $name: ModelPerms = ModelPerms {
            view: concat!($app, ".view_", $model),
            add: concat!($app, ".add_", $model),
            change: concat!($app, ".change_", $model),
            delete: concat!($app, ".delete_", $model),
        };
    };
}

// Members
model_perms!(MEMBER, "members", "member");
model_perms!(PARENT, "members", "parent");
model_perms!(MEMBER_STATUS, "members", "status");
model_perms!(MEMBER_GROUP, "members", "group");
model_perms!(EVENT_TYPE, "members", "eventtype");
model_perms!(MEMBER_EVENT, "members", "event");

// Inventory
model_perms!(CATEGORY, "inventory", "category");
model_perms!(ITEM, "inventory", "item");
model_perms!(ITEM_VARIANT, "inventory", "itemvariant");
model_perms!(STORAGE_LOCATION, "inventory", "storagelocation");
model_perms!(STOCK, "inventory", "stock");
model_perms!(TRANSACTION, "inventory", "transaction");
pub const DISCARD_ITEMS: &str = "inventory.discard_items";

// Orders
model_perms!(ORDERABLE_ITEM, "orders", "orderableitem");
model_perms!(ORDER_STATUS, "orders", "orderstatus");
model_perms!(ORDER, "orders", "order");
pub const MANAGE_ORDERS: &str = "orders.can_manage_orders";
pub const CHANGE_ORDER_STATUS: &str = "orders.can_change_order_status";

// Notifications
model_perms!(NOTIFICATION_LOG, "notifications", "notificationlog");
model_perms!(EMAIL_TEMPLATE, "notifications", "emailtemplate");

// Qualifications
model_perms!(QUALIFICATION_TYPE, "qualifications", "qualificationtype");
model_perms!(QUALIFICATION, "qualifications", "qualification");
model_perms!(SPECIAL_TASK_TYPE, "qualifications", "specialtasktype");
model_perms!(SPECIAL_TASK, "qualifications", "specialtask");
pub const VIEW_ALL_QUALIFICATIONS: &str = "qualifications.view_all_qualifications";
pub const MANAGE_QUALIFICATIONS: &str = "qualifications.manage_qualifications";
pub const VIEW_ALL_SPECIAL_TASKS: &str = "qualifications.view_all_specialtasks";
pub const MANAGE_SPECIAL_TASKS: &str = "qualifications.manage_specialtasks";

// Servicebook
model_perms!(SERVICE, "servicebook", "service");
model_perms!(ATTENDANCE, "servicebook", "attendance");

// Settings
pub const VIEW_ALL_SETTINGS: &str = "settings.view_all_settings";
pub const CHANGE_ALL_SETTINGS: &str = "settings.change_all_settings";

/// The kind of access requested on a settings category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsAccess {
    View,
    Change,
}

impl SettingsAccess {
    fn verb(self) -> &'static str {
        match self {
            SettingsAccess::View => "view",
            SettingsAccess::Change => "change",
        }
    }
}

/// Permission codename guarding one settings category, e.g.
/// `settings.change_email_settings`.
pub fn settings_permission(category_code: &str, access: SettingsAccess) -> String {
    format!("settings.{}_{}_settings", access.verb(), category_code)
}

/// The effective permission set of a user.
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
    is_superuser: bool,
    granted: HashSet<String>,
}

impl PermissionSet {
    pub fn new(is_superuser: bool, granted: impl IntoIterator<Item = String>) -> Self {
        Self {
            is_superuser,
            granted: granted.into_iter().collect(),
        }
    }

    pub fn is_superuser(&self) -> bool {
        self.is_superuser
    }

    /// Whether the user holds `perm`. Superusers hold everything.
    pub fn has(&self, perm: &str) -> bool {
        self.is_superuser || self.granted.contains(perm)
    }

    /// Whether the user holds at least one of `perms`.
    pub fn has_any(&self, perms: &[&str]) -> bool {
        perms.iter().any(|p| self.has(p))
    }

    /// Settings access: the category permission or the matching `*_all_settings`.
    pub fn can_access_settings(&self, category_code: &str, access: SettingsAccess) -> bool {
        let all = match access {
            SettingsAccess::View => VIEW_ALL_SETTINGS,
            SettingsAccess::Change => CHANGE_ALL_SETTINGS,
        };
        self.has(all) || self.has(&settings_permission(category_code, access))
    }

    /// Granted codenames, sorted.
    pub fn granted(&self) -> Vec<String> {
        let mut perms: Vec<String> = self.granted.iter().cloned().collect();
        perms.sort();
        perms
    }
}

/// Validate the shape of a permission codename (`app.codename`).
pub fn validate_codename(codename: &str) -> Result<(), crate::error::CoreError> {
    let valid = codename
        .split_once('.')
        .map(|(app, name)| {
            !app.is_empty()
                && !name.is_empty()
                && codename
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '.')
        })
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(crate::error::CoreError::Validation(format!(
            "Invalid permission codename '{codename}'"
        )))
    }
}
