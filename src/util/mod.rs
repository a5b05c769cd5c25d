pub(crate) fn now_ms() -> i64 {
    js_sys::Date::now().round() as i64
}

/// Local wall-clock time of `ms` as `HH:MM`.
pub(crate) fn format_clock(ms: i64) -> String {
    let d = js_sys::Date::new(&(ms as f64).into());
    format!("{:02}:{:02}", d.get_hours(), d.get_minutes())
}
