mod byte_order_reader;
mod byte_order_writer;

pub use byte_order_reader::ByteOrderReader;
pub use byte_order_writer::ByteOrderWriter;
