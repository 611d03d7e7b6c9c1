//! Askama filters shared by the dashboard templates.

pub fn money(value: &f64) -> askama::Result<String> {
    Ok(format!("₹{value:.2}"))
}
