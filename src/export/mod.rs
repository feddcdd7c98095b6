pub mod csv;

pub use self::csv::render_csv;
