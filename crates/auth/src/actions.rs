use serde::Serialize;

/// Actions gated by the role & ownership policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CreateProduct,
    MutateProduct,
    DeleteProduct,
    ManageUsers,
    ReadCart,
    ModifyCart,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateProduct => "products.create",
            Action::MutateProduct => "products.update",
            Action::DeleteProduct => "products.delete",
            Action::ManageUsers => "users.manage",
            Action::ReadCart => "carts.read",
            Action::ModifyCart => "carts.update",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
