/// Column names of the CSV output, in row order
pub const CSV_HEADER: [&str; 5] = ["name", "comments", "rate", "price", "symbol"];

/// One product listing pulled from a page
///
/// All fields are kept as the text shown on the page; the price stays a
/// string so no precision is lost. Fields the markup did not provide are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Record {
    pub name: String,
    pub comment_count: String,
    pub rating: String,
    pub price: String,
    pub currency_symbol: String,
}

impl Record {
    /// Fields in the order of [`CSV_HEADER`]
    pub fn csv_row(&self) -> [&str; 5] {
        [
            &self.name,
            &self.comment_count,
            &self.rating,
            &self.price,
            &self.currency_symbol,
        ]
    }

    /// Natural key used for optional de-duplication
    pub fn natural_key(&self) -> (&str, &str) {
        (&self.name, &self.price)
    }
}
