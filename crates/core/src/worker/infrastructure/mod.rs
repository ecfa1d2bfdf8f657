pub mod threaded_worker_host;
