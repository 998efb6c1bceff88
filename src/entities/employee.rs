//! Employees and their permissions

use crate::impl_document;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of employee permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewProducts,
    EditProducts,
    ViewClients,
    EditClients,
    ViewInvoices,
    CreateInvoices,
    ViewReports,
}

impl Permission {
    pub const ALL: [Permission; 7] = [
        Permission::ViewProducts,
        Permission::EditProducts,
        Permission::ViewClients,
        Permission::EditClients,
        Permission::ViewInvoices,
        Permission::CreateInvoices,
        Permission::ViewReports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewProducts => "view_products",
            Permission::EditProducts => "edit_products",
            Permission::ViewClients => "view_clients",
            Permission::EditClients => "edit_clients",
            Permission::ViewInvoices => "view_invoices",
            Permission::CreateInvoices => "create_invoices",
            Permission::ViewReports => "view_reports",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A staff member
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl_document!(
    Employee,
    "employees",
    "employee",
    ["name", "email", "position"],
    validate: {
        create: {
            name: [required, string_length(1, 200)],
            email: [optional, email],
            position: [optional, string_length(0, 100)],
            permissions: [optional, in_list(
                "view_products",
                "edit_products",
                "view_clients",
                "edit_clients",
                "view_invoices",
                "create_invoices",
                "view_reports",
            )],
        },
        update: {
            name: [optional, string_length(1, 200)],
            email: [optional, email],
            position: [optional, string_length(0, 100)],
            permissions: [optional, in_list(
                "view_products",
                "edit_products",
                "view_clients",
                "edit_clients",
                "view_invoices",
                "create_invoices",
                "view_reports",
            )],
        },
    },
    filters: {
        create: {
            name: [trim],
            email: [trim, lowercase],
            position: [trim],
        },
        update: {
            name: [trim],
            email: [trim, lowercase],
            position: [trim],
        },
    }
);

impl Employee {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}
