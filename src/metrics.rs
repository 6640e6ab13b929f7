// src/metrics.rs

#[cfg(feature = "observability")]
use metrics::{counter, gauge};

// No-op stand-ins when the observability feature is disabled.
#[cfg(not(feature = "observability"))]
macro_rules! counter {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {{
        let _ = ($name, $value $(, $label, $label_value)*);
    }};
}

#[cfg(not(feature = "observability"))]
macro_rules! gauge {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {{
        let _ = ($name, $value $(, $label, $label_value)*);
    }};
}

pub fn increment_cache_hit(cache_name: &str) {
    counter!("cache_hits_total", 1, "cache" => cache_name.to_string());
}

pub fn increment_cache_miss(cache_name: &str) {
    counter!("cache_miss_total", 1, "cache" => cache_name.to_string());
}

pub fn increment_query_coalesced(cache_name: &str) {
    counter!("query_coalesced_total", 1, "cache" => cache_name.to_string());
}

pub fn increment_discarded_write(cache_name: &str) {
    counter!("query_discarded_writes_total", 1, "cache" => cache_name.to_string());
}

pub fn increment_cache_eviction(cache_name: &str) {
    counter!("cache_evictions_total", 1, "cache" => cache_name.to_string());
}

pub fn set_cache_size(cache_name: &str, size: f64) {
    gauge!("cache_size_gauge", size, "cache" => cache_name.to_string());
}

pub fn set_slice_size(slice_name: &str, size: f64) {
    gauge!("slice_size_gauge", size, "slice" => slice_name.to_string());
}
