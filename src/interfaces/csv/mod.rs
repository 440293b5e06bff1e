pub mod journal_reader;
pub mod report_writer;
