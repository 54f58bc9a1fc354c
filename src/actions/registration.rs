//! Admin UI SDK extension registrations.
//!
//! Each `registration` action answers with a static description of what the
//! extension contributes to the Commerce Admin: menu entries, grid mass
//! actions, banner messages for those actions, or extra grid columns.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::json;

use super::{ActionEnv, ActionParams, ActionResponse};

const CUSTOM_MENU: &str = "custom-menu";
const ORDER_MASS_ACTION: &str = "order-custom-mass-action";
const PRODUCT_MASS_ACTION: &str = "product-custom-mass-action";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_section: Option<bool>,
    pub sort_order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Confirm {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MassAction {
    pub action_id: String,
    pub label: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm: Option<Confirm>,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_select_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_iframe: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerMessage {
    pub action_id: String,
    pub success_message: String,
    pub error_message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Integer,
    Date,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridColumn {
    pub label: String,
    pub column_id: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
    pub align: String,
}

/// Where the Admin fetches column values from; empty until a mesh is wired up.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridColumnSource {
    pub mesh_id: String,
    pub api_key: String,
}

fn action_id(extension: &str, action: &str) -> String {
    format!("{extension}::{action}")
}

fn confirm(target: &str) -> Confirm {
    Confirm {
        title: "Mass Action".to_owned(),
        message: format!("Are you sure your want to proceed with Mass Action on selected {target}?"),
    }
}

pub fn menu_items() -> Vec<MenuItem> {
    vec![
        MenuItem {
            id: action_id(CUSTOM_MENU, "first"),
            title: "First App on App Builder".to_owned(),
            parent: Some(action_id(CUSTOM_MENU, "apps")),
            is_section: None,
            sort_order: 1,
        },
        MenuItem {
            id: action_id(CUSTOM_MENU, "apps"),
            title: "Apps".to_owned(),
            parent: None,
            is_section: Some(true),
            sort_order: 100,
        },
    ]
}

pub fn order_mass_actions() -> Vec<MassAction> {
    vec![
        MassAction {
            action_id: action_id(ORDER_MASS_ACTION, "order-mass-action"),
            label: "Order Mass Action".to_owned(),
            confirm: Some(confirm("orders")),
            path: "#/order-mass-action".to_owned(),
            selection_limit: Some(1),
            ..MassAction::default()
        },
        MassAction {
            action_id: action_id(ORDER_MASS_ACTION, "mass-action-with-redirect"),
            label: "Mass Action With Redirect".to_owned(),
            title: Some("Order Mass Action With Redirect".to_owned()),
            path: "#/mass-action-with-redirect".to_owned(),
            ..MassAction::default()
        },
        MassAction {
            action_id: action_id(ORDER_MASS_ACTION, "mass-action-no-iFrame"),
            label: "Mass Action No iFrame".to_owned(),
            path: "api/v1/web/mass-actions/massAction".to_owned(),
            display_iframe: Some(false),
            ..MassAction::default()
        },
    ]
}

pub fn product_mass_actions() -> Vec<MassAction> {
    let kind = |action: &str| Some(format!("{PRODUCT_MASS_ACTION}.{action}"));
    vec![
        MassAction {
            action_id: action_id(PRODUCT_MASS_ACTION, "product-mass-action"),
            label: "Product Mass Action".to_owned(),
            kind: kind("product-mass-action"),
            confirm: Some(confirm("products")),
            path: "#/mass-action".to_owned(),
            product_select_limit: Some(1),
            ..MassAction::default()
        },
        MassAction {
            action_id: action_id(PRODUCT_MASS_ACTION, "mass-action-with-redirect"),
            label: "Mass Action With Redirect".to_owned(),
            kind: kind("mass-action-with-redirect"),
            path: "#/mass-action-with-redirect".to_owned(),
            ..MassAction::default()
        },
    ]
}

fn banner(extension: &str, subject: &str) -> BannerMessage {
    BannerMessage {
        action_id: action_id(extension, "mass-action-with-redirect"),
        success_message: format!("{subject} custom success message"),
        error_message: format!("{subject} custom error message"),
    }
}

pub fn order_grid_columns() -> Vec<GridColumn> {
    [
        ("First App Column", "first_column", ColumnType::String),
        ("Second App Column", "second_column", ColumnType::Integer),
        ("Third App Column", "third_column", ColumnType::Date),
    ]
    .into_iter()
    .map(|(label, column_id, kind)| GridColumn {
        label: label.to_owned(),
        column_id: column_id.to_owned(),
        kind,
        align: "left".to_owned(),
    })
    .collect()
}

pub(super) fn custom_menu(_env: &ActionEnv, _params: ActionParams) -> BoxFuture<'_, ActionResponse> {
    async { ActionResponse::ok(json!({ "registration": { "menuItems": menu_items() } })) }.boxed()
}

pub(super) fn order_mass_action(
    _env: &ActionEnv,
    _params: ActionParams,
) -> BoxFuture<'_, ActionResponse> {
    async {
        ActionResponse::ok(json!({
            "registration": { "order": { "massActions": order_mass_actions() } }
        }))
    }
    .boxed()
}

pub(super) fn product_mass_action(
    _env: &ActionEnv,
    _params: ActionParams,
) -> BoxFuture<'_, ActionResponse> {
    async {
        ActionResponse::ok(json!({
            "registration": { "product": { "massActions": product_mass_actions() } }
        }))
    }
    .boxed()
}

pub(super) fn banner_notification(
    _env: &ActionEnv,
    _params: ActionParams,
) -> BoxFuture<'_, ActionResponse> {
    async {
        ActionResponse::ok(json!({
            "registration": {
                "bannerNotification": {
                    "massActions": {
                        "order": [banner(ORDER_MASS_ACTION, "Order")],
                        "product": [banner(PRODUCT_MASS_ACTION, "Product")],
                    }
                }
            }
        }))
    }
    .boxed()
}

pub(super) fn order_grid_columns_registration(
    _env: &ActionEnv,
    _params: ActionParams,
) -> BoxFuture<'_, ActionResponse> {
    async {
        ActionResponse::ok(json!({
            "registration": {
                "order": {
                    "gridColumns": {
                        "data": GridColumnSource::default(),
                        "properties": order_grid_columns(),
                    }
                }
            }
        }))
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn env() -> ActionEnv {
        ActionEnv::new(reqwest::Client::new())
    }

    #[tokio::test]
    async fn menu_registration_shape() {
        let response = custom_menu(&env(), ActionParams::new()).await;
        assert_eq!(
            response.body()["registration"]["menuItems"],
            json!([
                { "id": "custom-menu::first", "title": "First App on App Builder", "parent": "custom-menu::apps", "sortOrder": 1 },
                { "id": "custom-menu::apps", "title": "Apps", "isSection": true, "sortOrder": 100 }
            ])
        );
    }

    #[tokio::test]
    async fn order_mass_actions_skip_unset_fields() {
        let response = order_mass_action(&env(), ActionParams::new()).await;
        let actions = &response.body()["registration"]["order"]["massActions"];

        assert_eq!(actions[0]["selectionLimit"], 1);
        assert_eq!(actions[0]["confirm"]["title"], "Mass Action");
        assert!(actions[1].get("confirm").is_none());
        assert_eq!(actions[2]["displayIframe"], false);
        assert_eq!(actions[2]["actionId"], "order-custom-mass-action::mass-action-no-iFrame");
    }

    #[tokio::test]
    async fn product_mass_actions_carry_type() {
        let response = product_mass_action(&env(), ActionParams::new()).await;
        let first = &response.body()["registration"]["product"]["massActions"][0];
        assert_eq!(first["type"], "product-custom-mass-action.product-mass-action");
        assert_eq!(first["productSelectLimit"], 1);
    }

    #[tokio::test]
    async fn banner_messages_for_both_grids() {
        let response = banner_notification(&env(), ActionParams::new()).await;
        let actions = &response.body()["registration"]["bannerNotification"]["massActions"];
        assert_eq!(
            actions["order"][0],
            json!({
                "actionId": "order-custom-mass-action::mass-action-with-redirect",
                "successMessage": "Order custom success message",
                "errorMessage": "Order custom error message"
            })
        );
        assert_eq!(actions["product"][0]["errorMessage"], "Product custom error message");
    }

    #[tokio::test]
    async fn grid_column_properties() {
        let response = order_grid_columns_registration(&env(), ActionParams::new()).await;
        let grid = &response.body()["registration"]["order"]["gridColumns"];
        assert_eq!(grid["data"], json!({ "meshId": "", "apiKey": "" }));
        let types: Vec<&Value> = grid["properties"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| &c["type"])
            .collect();
        assert_eq!(types, [&json!("string"), &json!("integer"), &json!("date")]);
    }
}
