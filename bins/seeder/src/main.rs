//! Database seeder for Saldo development and testing.
//!
//! Seeds a default chart of accounts for local development.
//!
//! Usage: cargo run --bin seeder

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use saldo_core::account::AccountClass;
use saldo_db::entities::accounts;
use saldo_db::repositories::{AccountRepository, CreateAccountInput};

/// One row of the default chart: code, name, class, parent code,
/// summary flag, critical flag.
type ChartRow = (
    &'static str,
    &'static str,
    AccountClass,
    Option<&'static str>,
    bool,
    bool,
);

const DEFAULT_CHART: &[ChartRow] = &[
    ("1000", "Assets", AccountClass::Asset, None, true, false),
    ("1100", "Cash", AccountClass::Asset, Some("1000"), false, true),
    ("1200", "Bank", AccountClass::Asset, Some("1000"), false, true),
    ("1300", "Accounts Receivable", AccountClass::Asset, Some("1000"), false, true),
    ("1400", "Inventory", AccountClass::Asset, Some("1000"), false, false),
    ("2000", "Liabilities", AccountClass::Liability, None, true, false),
    ("2100", "Accounts Payable", AccountClass::Liability, Some("2000"), false, true),
    ("2200", "Tax Payable", AccountClass::Liability, Some("2000"), false, false),
    ("3000", "Equity", AccountClass::Equity, None, true, false),
    ("3100", "Owner's Capital", AccountClass::Equity, Some("3000"), false, false),
    ("3200", "Retained Earnings", AccountClass::Equity, Some("3000"), false, true),
    ("4000", "Revenue", AccountClass::Revenue, None, true, false),
    ("4100", "Sales Revenue", AccountClass::Revenue, Some("4000"), false, true),
    ("4200", "Service Revenue", AccountClass::Revenue, Some("4000"), false, false),
    ("5000", "Expenses", AccountClass::Expense, None, true, false),
    ("5100", "Cost of Goods Sold", AccountClass::Expense, Some("5000"), false, true),
    ("5200", "Operating Expenses", AccountClass::Expense, Some("5000"), false, false),
];

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    println!("Connecting to database...");
    let db = saldo_db::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    println!("Seeding default chart of accounts...");
    seed_chart(&db).await;

    println!("Seeding complete!");
}

async fn seed_chart(db: &DatabaseConnection) {
    let repo = AccountRepository::new(db.clone());

    for (code, name, class, parent_code, is_summary, is_critical) in DEFAULT_CHART {
        if find_by_code(db, code).await.is_some() {
            println!("  {code} {name} - already present, skipping");
            continue;
        }

        let parent_id = match parent_code {
            Some(parent) => Some(
                find_by_code(db, parent)
                    .await
                    .unwrap_or_else(|| panic!("parent account {parent} must be seeded first"))
                    .id,
            ),
            None => None,
        };

        repo.create_account(CreateAccountInput {
            code: (*code).to_string(),
            name: (*name).to_string(),
            description: None,
            class: *class,
            category: None,
            parent_id,
            is_summary: *is_summary,
            is_critical: *is_critical,
            is_active: true,
        })
        .await
        .unwrap_or_else(|e| panic!("failed to seed account {code}: {e}"));
        println!("  {code} {name} - created");
    }
}

async fn find_by_code(db: &DatabaseConnection, code: &str) -> Option<accounts::Model> {
    accounts::Entity::find()
        .filter(accounts::Column::Code.eq(code))
        .filter(accounts::Column::DeletedAt.is_null())
        .one(db)
        .await
        .expect("failed to query accounts")
}
