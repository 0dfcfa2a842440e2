mod common;

use axum::http::StatusCode;
use axum::http::Method;
use common::{decimal, response_json, TestApp};
use rust_decimal_macros::dec;
use rust_xlsxwriter::Workbook;
use serde_json::Value;

const PRICE_LIST: &str = "Прайс-лист поставщика\n\
\n\
Наименование\tЕд. изм.\tЦена\tКоличество\n\
Bracket\tшт\t150\t1\n\
Hinge\tшт\t60,00\t2\n\
Screw\tшт\t10\t100\n\
Discontinued\tшт\t5\t0\n";

async fn import_price_list(app: &TestApp) -> Value {
    let response = app.post("/api/v1/import", Some(PRICE_LIST)).await;
    assert_eq!(response.status(), StatusCode::OK);
    response_json(response).await
}

async fn run_grouping(app: &TestApp) -> Value {
    let response = app.post("/api/v1/admin/grouping/run", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    response_json(response).await
}

fn find_group<'a>(groups: &'a [Value], name: &str) -> &'a Value {
    groups
        .iter()
        .find(|g| g["name"] == name)
        .unwrap_or_else(|| panic!("group {name} not listed"))
}

#[tokio::test]
async fn import_creates_batches_for_rows_with_stock() {
    let app = TestApp::new().await;

    let body = import_price_list(&app).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["imported_count"], 3);

    let response = app.get("/api/v1/admin/batches").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let batches = body["data"].as_array().unwrap();
    assert_eq!(batches.len(), 3);
    for batch in batches {
        assert_eq!(batch["status"], "new");
        assert_eq!(batch["remaining_quantity"], batch["initial_quantity"]);
    }
    let hinge = batches.iter().find(|b| b["name"] == "Hinge").unwrap();
    assert_eq!(decimal(&hinge["unit_price"]), dec!(60));
}

#[tokio::test]
async fn xlsx_upload_is_imported_and_grouped() {
    let app = TestApp::new().await;
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Прайс-лист поставщика").unwrap();
    for (col, title) in ["Наименование", "Ед. изм.", "Цена", "Количество"].iter().enumerate() {
        sheet.write_string(2, col as u16, *title).unwrap();
    }
    for (row, (name, price, quantity)) in [("Bracket", 150.0, 1.0), ("Hinge", 60.0, 2.0), ("Screw", 10.0, 100.0)]
        .into_iter()
        .enumerate()
    {
        let row = row as u32 + 3;
        sheet.write_string(row, 0, name).unwrap();
        sheet.write_string(row, 1, "шт").unwrap();
        sheet.write_number(row, 2, price).unwrap();
        sheet.write_number(row, 3, quantity).unwrap();
    }
    let bytes = workbook.save_to_buffer().unwrap();

    let response = app.request(Method::POST, "/api/v1/import", Some(bytes)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["imported_count"], 3);

    let body = run_grouping(&app).await;
    assert_eq!(body["data"]["created_groups"], 7);
}

#[tokio::test]
async fn empty_import_is_rejected() {
    let app = TestApp::new().await;

    let response = app.post("/api/v1/import", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Bad Request");
}

#[tokio::test]
async fn sheet_without_header_is_rejected_before_anything_is_written() {
    let app = TestApp::new().await;

    let response = app
        .post("/api/v1/import", Some("foo\tbar\n1\t2\n"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("Header row"));

    let batches = app.batches().find_all().await.unwrap();
    assert!(batches.is_empty());
}

#[tokio::test]
async fn manual_run_groups_all_stock() {
    let app = TestApp::new().await;
    import_price_list(&app).await;

    let body = run_grouping(&app).await;
    assert_eq!(body["data"]["created_groups"], 7);
    assert_eq!(body["data"]["batches_exhausted"], 3);
    assert_eq!(body["data"]["cancelled"], false);

    let body = response_json(app.get("/api/v1/groups").await).await;
    let groups = body["data"].as_array().unwrap().clone();
    assert_eq!(groups.len(), 7);
    assert_eq!(groups[0]["name"], "Group 7");

    let mut totals: Vec<_> = groups.iter().map(|g| decimal(&g["total_price"])).collect();
    totals.sort();
    assert_eq!(
        totals,
        vec![dec!(70), dec!(200), dec!(200), dec!(200), dec!(200), dec!(200), dec!(200)]
    );

    let first = find_group(&groups, "Group 1");
    let uri = format!("/api/v1/groups/{}/items", first["id"].as_str().unwrap());
    let response = app.get(&uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "Bracket");
    assert_eq!(items[0]["quantity"], 1);
    assert_eq!(decimal(&items[0]["line_total"]), dec!(150));
    assert_eq!(items[1]["name"], "Screw");
    assert_eq!(items[1]["quantity"], 5);
    assert_eq!(decimal(&items[1]["line_total"]), dec!(50));

    let body = response_json(app.get("/api/v1/admin/batches").await).await;
    for batch in body["data"].as_array().unwrap() {
        assert_eq!(batch["remaining_quantity"], 0);
        assert_eq!(batch["status"], "processed");
    }
}

#[tokio::test]
async fn second_run_creates_nothing() {
    let app = TestApp::new().await;
    import_price_list(&app).await;
    run_grouping(&app).await;

    let body = run_grouping(&app).await;
    assert_eq!(body["data"]["created_groups"], 0);

    let body = response_json(app.get("/api/v1/groups?take=200").await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn group_numbering_continues_after_new_imports() {
    let app = TestApp::new().await;
    app.seed_batch("Panel", dec!(100), 2).await;
    run_grouping(&app).await;

    app.seed_batch("Frame", dec!(200), 1).await;
    let body = run_grouping(&app).await;
    assert_eq!(body["data"]["created_groups"], 1);

    let body = response_json(app.get("/api/v1/groups").await).await;
    let names: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Group 2", "Group 1"]);
}

#[tokio::test]
async fn group_listing_pages_and_clamps() {
    let app = TestApp::new().await;
    import_price_list(&app).await;
    run_grouping(&app).await;

    let body = response_json(app.get("/api/v1/groups?skip=2&take=3").await).await;
    let names: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Group 5", "Group 4", "Group 3"]);

    let body = response_json(app.get("/api/v1/groups?take=0").await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn items_of_unknown_group_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .get("/api/v1/groups/00000000-0000-0000-0000-000000000001/items")
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn oversized_and_free_batches() {
    let app = TestApp::new().await;
    let oversized = app.seed_batch("Cabinet", dec!(250), 3).await;
    let free = app.seed_batch("Sample", dec!(0), 4).await;

    let body = run_grouping(&app).await;
    assert_eq!(body["data"]["created_groups"], 0);
    assert_eq!(body["data"]["unallocatable_batches"], 1);

    let oversized = app.batches().find_by_id(oversized.id).await.unwrap().unwrap();
    assert_eq!(oversized.remaining_quantity, 3);

    let free = app.batches().find_by_id(free.id).await.unwrap().unwrap();
    assert_eq!(free.remaining_quantity, 0);
    assert_eq!(free.status.to_string(), "processed");
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = TestApp::new().await;

    let response = app.get("/api/v1/status").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["grouping_running"], false);
    assert!(body["meta"]["request_id"].is_string());
}

#[tokio::test]
async fn health_reports_database() {
    let app = TestApp::new().await;

    let body = response_json(app.get("/api/v1/health").await).await;
    assert_eq!(body["data"]["database"], "healthy");

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
}
