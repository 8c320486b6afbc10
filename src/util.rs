// Small helpers shared by the engine, the games and the screens.

use chrono::NaiveDate;

/// Formats whole seconds as `m:ss` for the HUD.
pub fn format_clock(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

pub fn ease_in_quad(t: f64) -> f64 {
    t * t
}

pub fn ease_out_quad(t: f64) -> f64 {
    t * (2.0 - t)
}

pub fn point_in_circle(px: f64, py: f64, cx: f64, cy: f64, radius: f64) -> bool {
    let dx = px - cx;
    let dy = py - cy;
    dx * dx + dy * dy <= radius * radius
}

fn hex_to_rgb(hex: &str) -> (u8, u8, u8) {
    let h = hex.trim_start_matches('#');
    if h.len() != 6 {
        return (0, 0, 0);
    }
    let channel = |i: usize| u8::from_str_radix(&h[i..i + 2], 16).unwrap_or(0);
    (channel(0), channel(2), channel(4))
}

/// `#rrggbb` -> `rgba(r, g, b, alpha)`.
pub fn with_alpha(hex: &str, alpha: f64) -> String {
    let (r, g, b) = hex_to_rgb(hex);
    format!("rgba({}, {}, {}, {})", r, g, b, alpha.clamp(0.0, 1.0))
}

/// Moves a colour towards black by `amount` (0..1).
pub fn darken(hex: &str, amount: f64) -> String {
    let (r, g, b) = hex_to_rgb(hex);
    let k = 1.0 - amount.clamp(0.0, 1.0);
    let f = |c: u8| (c as f64 * k).round() as u8;
    format!("#{:02x}{:02x}{:02x}", f(r), f(g), f(b))
}

/// Milliseconds since the epoch, from the browser clock.
pub fn now_ms() -> f64 {
    js_sys::Date::now()
}

/// Today's calendar date (UTC), as used by the day-streak counter.
pub fn today() -> Option<NaiveDate> {
    let d = js_sys::Date::new_0();
    NaiveDate::from_ymd_opt(
        d.get_utc_full_year() as i32,
        d.get_utc_month() + 1,
        d.get_utc_date(),
    )
}

/// Seed for the per-session RNG.
pub fn random_seed() -> u64 {
    (js_sys::Math::random() * u64::MAX as f64) as u64 ^ now_ms() as u64
}
