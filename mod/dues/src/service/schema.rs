use acpn_sql::SQLStore;

use acpn_core::ServiceError;

/// Initialize the SQLite schema for dues resources.
pub fn init_schema(sql: &dyn SQLStore) -> Result<(), ServiceError> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS due_types (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_due_types_name ON due_types(name)",

        // Numeric columns are indexed alongside the JSON document so
        // analytics can aggregate without deserializing every record.
        "CREATE TABLE IF NOT EXISTS dues (
            id TEXT PRIMARY KEY,
            pharmacy_id TEXT NOT NULL,
            due_type_id TEXT NOT NULL,
            year INTEGER NOT NULL,
            payment_status TEXT NOT NULL,
            due_date TEXT NOT NULL,
            total_amount REAL NOT NULL,
            amount_paid REAL NOT NULL,
            balance REAL NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        // One due per (pharmacy, due type, year); the insert conflict is
        // the duplicate-prevention mechanism.
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_dues_pharmacy_type_year
            ON dues(pharmacy_id, due_type_id, year)",
        "CREATE INDEX IF NOT EXISTS idx_dues_status ON dues(payment_status)",
        "CREATE INDEX IF NOT EXISTS idx_dues_year ON dues(year)",
        "CREATE INDEX IF NOT EXISTS idx_dues_balance ON dues(balance)",

        "CREATE TABLE IF NOT EXISTS due_payments (
            id TEXT PRIMARY KEY,
            due_id TEXT NOT NULL,
            pharmacy_id TEXT NOT NULL,
            approval_status TEXT NOT NULL,
            amount REAL NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_due_payments_due ON due_payments(due_id)",
        "CREATE INDEX IF NOT EXISTS idx_due_payments_pharmacy
            ON due_payments(pharmacy_id)",
        "CREATE INDEX IF NOT EXISTS idx_due_payments_status
            ON due_payments(approval_status)",
    ];

    for stmt in &statements {
        sql.exec(stmt, &[])
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
    }

    Ok(())
}
