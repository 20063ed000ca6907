use super::SqlDialect;

#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn write_placeholder(&self, out: &mut String, index: usize, _name: &str) {
        out.push('$');
        out.push_str(itoa::Buffer::new().format(index));
    }
}
