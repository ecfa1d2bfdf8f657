pub mod image_file_exporter;
