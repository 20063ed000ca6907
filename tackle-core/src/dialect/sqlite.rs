use super::SqlDialect;

/// SQLite speaks the default rendering; only its name differs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }
}
