pub mod collector;
pub mod segmenter;
