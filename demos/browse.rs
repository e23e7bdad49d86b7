/// Browse Example
///
/// This example demonstrates:
/// - Loading a dataset from a provider in chunks, with progress
/// - Wildcard search with highlighted hits
/// - Sorting, column selection and paging
/// - Showing the detail of one record

use recordview::{
    mark_spans, ChunkLoader, Criterion, LoadOutcome, MatchMode, MemoryProvider, Operator, Query,
    ViewCoordinator, ViewSnapshot,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn print_page(snapshot: &ViewSnapshot) {
    println!(
        "   Showing {}-{} of {} ({} total), page {}/{}",
        snapshot.showing_from,
        snapshot.showing_to,
        snapshot.filtered_records,
        snapshot.total_records,
        snapshot.page + 1,
        snapshot.total_pages.max(1)
    );
    println!("   {}", snapshot.columns.join(" | "));
    for row in snapshot.rows.iter().take(5) {
        let cells: Vec<String> = row
            .cells
            .iter()
            .map(|cell| mark_spans(&cell.text, &cell.highlights, "[", "]"))
            .collect();
        println!("   {}", cells.join(" | "));
    }
    println!();
}

#[tokio::main]
async fn main() {
    println!("=== RecordView Browse Example ===\n");

    // 1. A provider holding 2,500 records
    let names = ["John Smith", "Mary Jackson", "Jon Doe", "Ann Lee", "Joan Hart"];
    let units = ["Walls", "Ellis", "Byrd"];
    let rows: Vec<Value> = (0..2500)
        .map(|i| {
            let unit = if i % 11 == 0 { Value::Null } else { json!(units[i % units.len()]) };
            json!({
                "TDCJ": format!("{:08}", 100000 + i),
                "Name": format!("{} {}", names[i % names.len()], i),
                "Age": 18 + (i * 37) % 60,
                "Unit": unit,
            })
        })
        .collect();
    let provider = Arc::new(MemoryProvider::new().with_source("inmates", rows));
    let loader = ChunkLoader::new(provider);

    // 2. Load it
    println!("1. Loading 'inmates'...");
    let mut view = ViewCoordinator::new();
    let Some(ticket) = view.select_source("inmates") else {
        return;
    };
    let mut events = Vec::new();
    let result = loader.load("inmates", ticket.guard(), |p| events.push(p)).await;
    for progress in events {
        println!("   {}% ({} of {} records)", progress.percent(), progress.fetched, progress.total);
        view.apply_progress(&ticket, progress);
    }
    if view.complete_load(&ticket, result) != LoadOutcome::Applied {
        println!("   Load failed: {:?}", view.status());
        return;
    }
    print_page(&view.snapshot());

    // 3. Wildcard search
    println!("2. Searching for 'jo*n'...");
    if let Err(e) = view.set_query(Query::simple("jo*n")) {
        println!("   {}", e);
    }
    print_page(&view.snapshot());

    // 4. Sort by age, oldest first
    println!("3. Sorting by Age, descending...");
    let _ = view.set_sort("Age");
    let _ = view.set_sort("Age");
    let _ = view.set_selected_columns(&["Name", "Age"]);
    print_page(&view.snapshot());

    // 5. Advanced query
    println!("4. Records with no Unit or younger than 20...");
    let query = Query::advanced(
        vec![
            Criterion::new("Unit", Operator::Empty, ""),
            Criterion::new("Age", Operator::Less, "20"),
        ],
        MatchMode::Or,
    );
    if let Err(e) = view.set_query(query) {
        println!("   {}", e);
    }
    view.next_page();
    print_page(&view.snapshot());

    // 6. Detail of the first record on the page
    let first = view.page() * recordview::PAGE_SIZE;
    if let Some(detail) = view.record_detail(first) {
        println!("5. Detail of '{}':", detail.title);
        for field in detail.fields {
            println!("   {}: {}", field.column, field.value.unwrap_or_else(|| "-".to_string()));
        }
    }

    println!("\n=== Example Complete ===");
}
