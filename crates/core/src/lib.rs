pub mod export {
    pub mod domain {
        pub mod frame_exporter;
    }
    pub mod infrastructure;
}

pub mod shared {
    pub mod constants;
    pub mod decoded_image;
    pub mod frame;
    pub mod shared_arena;
    pub mod source_info;
}

pub mod source {
    pub mod domain {
        pub mod frame_source;
        pub mod playback_cursor;
    }
    pub mod infrastructure;
}

pub mod transport {
    pub mod domain {
        pub mod frame_record;
        pub mod output_channel;
    }
    pub mod infrastructure;
}

pub mod worker {
    pub mod error_slot;
    pub mod frame_worker;
    pub mod worker_logger;
    pub mod worker_state;
    pub mod infrastructure;
}
