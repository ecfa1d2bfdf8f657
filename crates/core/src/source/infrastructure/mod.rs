pub mod image_sequence_source;
pub mod source_factory;
pub mod video_file_source;
