//! Categorical palette for record rectangles.

use egui::Color32;

/// Fixed ordered palette record rectangles cycle through, keyed by
/// dataset position.
pub const RECORD_PALETTE: [Color32; 10] = [
    Color32::from_rgb(0x1f, 0x77, 0xb4), // blue
    Color32::from_rgb(0xff, 0x7f, 0x0e), // orange
    Color32::from_rgb(0x2c, 0xa0, 0x2c), // green
    Color32::from_rgb(0xd6, 0x27, 0x28), // red
    Color32::from_rgb(0x94, 0x67, 0xbd), // purple
    Color32::from_rgb(0x8c, 0x56, 0x4b), // brown
    Color32::from_rgb(0xe3, 0x77, 0xc2), // pink
    Color32::from_rgb(0x7f, 0x7f, 0x7f), // gray
    Color32::from_rgb(0xbc, 0xbd, 0x22), // olive
    Color32::from_rgb(0x17, 0xbe, 0xcf), // cyan
];

/// Color for the record at `index` in dataset order.
pub fn record_color(index: usize) -> Color32 {
    RECORD_PALETTE[index % RECORD_PALETTE.len()]
}
