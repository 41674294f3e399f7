use qrcode::render::svg;
use qrcode::QrCode;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Renders a member's badge QR encoding their id, as SVG markup.
/// Generated once at member creation and stored with the row.
pub fn member_badge_svg(member_id: Uuid) -> Result<String> {
    let code = QrCode::new(member_id.to_string().as_bytes())
        .map_err(|e| AppError::Internal(format!("QR generation failed: {}", e)))?;

    let image = code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_svg_markup() {
        let svg = member_badge_svg(Uuid::new_v4()).unwrap();
        assert!(svg.contains("<svg"));
    }
}
