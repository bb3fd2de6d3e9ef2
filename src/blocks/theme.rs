//! Theme tokens as CSS custom properties.

use crate::types::Customizations;

/// Reset, layout container and button styles shared by every page.
pub const BASE_CSS: &str = include_str!("../../static/base.css");

/// A single `:root` block declaring every theme token.
pub fn theme_css(c: &Customizations) -> String {
    let colors = &c.colors;
    let fonts = &c.fonts;
    format!(
        ":root {{\n  --primary: {};\n  --secondary: {};\n  --accent: {};\n  --background: {};\n  --text: {};\n  --text-secondary: {};\n  --border: {};\n  --font-heading: {};\n  --font-body: {};\n  --font-size-base: {};\n  --spacing-unit: {}px;\n}}\n",
        colors.primary,
        colors.secondary,
        colors.accent,
        colors.background,
        colors.text,
        colors.text_secondary,
        colors.border,
        fonts.heading,
        fonts.body,
        fonts.base_size,
        c.spacing.base_unit,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_block_carries_all_tokens() {
        let mut c = Customizations::default();
        c.colors.primary = "#ff0000".into();
        c.spacing.base_unit = 4;
        let css = theme_css(&c);
        assert!(css.starts_with(":root {"));
        assert!(css.contains("--primary: #ff0000;"));
        assert!(css.contains("--spacing-unit: 4px;"));
        assert!(css.contains("--font-size-base: 16px;"));
        assert_eq!(css.matches(":root").count(), 1);
    }
}
