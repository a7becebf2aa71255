//! Directory snapshot rendered as an SVG table.
//!
//! `/get_all_users` sends the operator a vector image of the whole user
//! table; SVG keeps arbitrary row counts readable without a raster
//! dependency.

use crate::domain::UserRecord;

const COLUMNS: [(&str, u32); 4] = [
    ("ID", 20),
    ("Username", 160),
    ("Phone", 360),
    ("Country", 540),
];
const WIDTH: u32 = 720;
const ROW_HEIGHT: u32 = 26;
const HEADER_HEIGHT: u32 = 40;

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render the user table as a standalone SVG document.
pub fn users_svg(users: &[UserRecord]) -> String {
    let height = HEADER_HEIGHT + ROW_HEIGHT * (users.len() as u32 + 1) + 20;
    let mut svg = String::with_capacity(512 + users.len() * 160);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"{height}\" \
         font-family=\"monospace\" font-size=\"14\">\n"
    ));
    svg.push_str(&format!(
        "  <rect width=\"{WIDTH}\" height=\"{height}\" fill=\"white\"/>\n"
    ));
    svg.push_str(&format!(
        "  <text x=\"20\" y=\"24\" font-size=\"18\" font-weight=\"bold\">Users: {}</text>\n",
        users.len()
    ));

    let header_y = HEADER_HEIGHT + 14;
    for (label, x) in COLUMNS {
        svg.push_str(&format!(
            "  <text x=\"{x}\" y=\"{header_y}\" font-weight=\"bold\">{label}</text>\n"
        ));
    }

    for (i, user) in users.iter().enumerate() {
        let y = header_y + ROW_HEIGHT * (i as u32 + 1);
        let cells = [
            user.id.0.to_string(),
            user.username.clone().unwrap_or_else(|| "-".to_string()),
            user.phone.clone(),
            user.country.clone(),
        ];
        for ((_, x), cell) in COLUMNS.iter().zip(cells) {
            svg.push_str(&format!(
                "  <text x=\"{x}\" y=\"{y}\">{}</text>\n",
                escape_xml(&cell)
            ));
        }
    }

    svg.push_str("</svg>\n");
    svg
}
