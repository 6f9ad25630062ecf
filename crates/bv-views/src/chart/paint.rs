//! Replays a [`DisplayList`] onto an egui painter.

use egui::epaint::TextShape;
use egui::{emath::Rot2, FontId, Painter, Shape};

use super::scene::{DisplayList, DrawCommand};

/// Play every command back onto `painter`, in list order.
pub fn paint_display_list(painter: &Painter, list: &DisplayList) {
    for command in list.commands() {
        match command {
            DrawCommand::Line {
                from,
                to,
                stroke,
                dash,
            } => match dash {
                Some(dash) => {
                    painter.extend(Shape::dashed_line(
                        &[*from, *to],
                        *stroke,
                        dash.on,
                        dash.off,
                    ));
                }
                None => {
                    painter.line_segment([*from, *to], *stroke);
                }
            },
            DrawCommand::Rect { rect, fill } => {
                painter.rect_filled(*rect, 0.0, *fill);
            }
            DrawCommand::Text {
                pos,
                text,
                size,
                color,
                anchor,
                angle,
            } => {
                let font = FontId::proportional(*size);
                if *angle == 0.0 {
                    painter.text(*pos, *anchor, text, font, *color);
                } else {
                    // TextShape rotates around its draw position, so
                    // offset it to keep the visual centre on `pos`.
                    let galley = painter.layout_no_wrap(text.clone(), font, *color);
                    let half = galley.size() / 2.0;
                    let draw_pos = *pos - Rot2::from_angle(*angle) * half;
                    let mut shape = TextShape::new(draw_pos, galley);
                    shape.angle = *angle;
                    painter.add(shape);
                }
            }
        }
    }
}
