pub mod status_watch;
