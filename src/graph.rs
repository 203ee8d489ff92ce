use crate::ir::{AxisSpec, Bar, ChartKind, ChartSpec, Layer, Panel, TextMark};
use crate::theme::{parse_color, FontFace, LineType, ResolvedLine, ResolvedRect, ResolvedText, ResolvedTheme};
use crate::{OutputFormat, RenderOptions};
use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::f64::consts::PI;

/// Points to pixels
const FONT_SCALE: f64 = 1.35;
const LEGEND_WIDTH: i32 = 160;
const STRIP_HEIGHT: i32 = 24;
const ARC_STEPS_PER_TURN: f64 = 180.0;

type Px = (i32, i32);

/// Draw a chart spec and encode it in the requested format
pub fn render_chart(spec: &ChartSpec, options: &RenderOptions) -> Result<Vec<u8>> {
    let size = (options.width, options.height);
    match options.format {
        OutputFormat::Png => {
            let mut buffer = vec![0u8; (options.width * options.height * 3) as usize];
            {
                let root = BitMapBackend::with_buffer(&mut buffer, size).into_drawing_area();
                draw_chart(&root, spec)?;
                root.present().context("Failed to present drawing")?;
            }
            encode_png(&buffer, options.width, options.height)
        }
        OutputFormat::Svg => {
            let mut svg = String::new();
            {
                let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
                draw_chart(&root, spec)?;
                root.present().context("Failed to present drawing")?;
            }
            Ok(svg.into_bytes())
        }
    }
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }
    Ok(png_bytes)
}

fn draw_chart<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, spec: &ChartSpec) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let theme = spec.theme.preset.resolve(spec.theme.ggstatsplot_layer);
    root.fill(&theme.plot_background.fill)
        .context("Failed to fill background")?;

    let (_, height) = root.dim_in_pixel();
    let header_h = header_height(spec, &theme);
    let footer_h = spec
        .labels
        .caption
        .as_deref()
        .map_or(0, |c| text_block_height(c, &theme.plot_caption) + 10);

    let (header, rest) = root.split_vertically(header_h);
    let (body, footer) = rest.split_vertically(height as i32 - header_h - footer_h);

    draw_header(&header, spec, &theme)?;
    if let Some(caption) = &spec.labels.caption {
        let (w, _) = footer.dim_in_pixel();
        draw_lines(&footer, caption, (w as i32 - 10, 2), &theme.plot_caption, HPos::Right)?;
    }

    match spec.kind {
        ChartKind::Pie => draw_pie_chart(&body, spec, &theme),
        ChartKind::Dot => draw_dot_chart(&body, spec, &theme),
    }
}

// === Text ===

fn font_px(text: &ResolvedText) -> f64 {
    text.size * FONT_SCALE
}

fn text_style<'a>(text: &'a ResolvedText, h: HPos, v: VPos) -> TextStyle<'a> {
    font_style(text).pos(Pos::new(h, v))
}

fn line_height(text: &ResolvedText) -> i32 {
    (font_px(text) * 1.25).ceil() as i32
}

/// Pixel height of a possibly multi-line string
pub fn text_block_height(s: &str, text: &ResolvedText) -> i32 {
    s.lines().count().max(1) as i32 * line_height(text)
}

/// Draw `s` line by line with its first line's top at `origin`
fn draw_lines<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    s: &str,
    origin: Px,
    text: &ResolvedText,
    h: HPos,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let style = text_style(text, h, VPos::Top);
    for (i, line) in s.lines().enumerate() {
        let y = origin.1 + i as i32 * line_height(text);
        area.draw(&Text::new(line.to_string(), (origin.0, y), style.clone()))
            .context("Failed to draw text")?;
    }
    Ok(())
}

/// Like [`draw_lines`] but centred on `center`
fn draw_centered<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    s: &str,
    center: Px,
    text: &ResolvedText,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let top = center.1 - text_block_height(s, text) / 2;
    draw_lines(area, s, (center.0, top), text, HPos::Center)
}

fn header_height(spec: &ChartSpec, theme: &ResolvedTheme) -> i32 {
    let title = spec
        .labels
        .title
        .as_deref()
        .map_or(0, |t| text_block_height(t, &theme.plot_title));
    let subtitle = spec
        .labels
        .subtitle
        .as_deref()
        .map_or(0, |s| text_block_height(s, &theme.plot_subtitle));
    title + subtitle + 16
}

fn draw_header<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    theme: &ResolvedTheme,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let mut y = 8;
    if let Some(title) = &spec.labels.title {
        draw_lines(area, title, (10, y), &theme.plot_title, HPos::Left)?;
        y += text_block_height(title, &theme.plot_title);
    }
    if let Some(subtitle) = &spec.labels.subtitle {
        draw_lines(area, subtitle, (10, y), &theme.plot_subtitle, HPos::Left)?;
    }
    Ok(())
}

// === Primitives ===

fn draw_rect<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    tl: Px,
    br: Px,
    rect: &ResolvedRect,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    area.draw(&Rectangle::new([tl, br], rect.fill.filled()))
        .context("Failed to draw rectangle")?;
    if let Some(border) = rect.border_color {
        let width = rect.border_width.max(1.0) as u32;
        area.draw(&Rectangle::new([tl, br], border.stroke_width(width)))
            .context("Failed to draw rectangle border")?;
    }
    Ok(())
}

fn color_or(name: &str, fallback: RGBColor) -> RGBColor {
    parse_color(name).unwrap_or(fallback)
}

// === Pie ===

/// Pixel position of a polar point; `frac` runs clockwise from twelve o'clock
pub fn polar_to_pixel(center: Px, radius: f64, frac: f64) -> Px {
    let theta = frac * 2.0 * PI;
    (
        center.0 + (radius * theta.sin()).round() as i32,
        center.1 - (radius * theta.cos()).round() as i32,
    )
}

/// Closed outline of the wedge between two fractions of a turn
pub fn wedge_points(center: Px, radius: f64, start: f64, end: f64) -> Vec<Px> {
    let steps = ((end - start) * ARC_STEPS_PER_TURN).ceil().max(1.0) as usize;
    let mut points = Vec::with_capacity(steps + 2);
    points.push(center);
    for i in 0..=steps {
        let frac = start + (end - start) * i as f64 / steps as f64;
        points.push(polar_to_pixel(center, radius, frac));
    }
    points
}

/// Radius of a mark at `x` when bars of width 1 sit at `x = 1`
fn radial(x: f64, outer: f64) -> f64 {
    (x - 0.5) * outer
}

fn draw_pie_chart<DB: DrawingBackend>(
    body: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    theme: &ResolvedTheme,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let (w, _) = body.dim_in_pixel();
    let (pies, legend) = body.split_horizontally(w as i32 - LEGEND_WIDTH);

    let layout = &spec.facet_layout;
    let cells = pies.split_evenly((layout.nrow, layout.ncol));
    for (panel, cell) in spec.panels.iter().zip(cells.iter()) {
        draw_pie_panel(cell, panel, theme)?;
    }

    draw_legend(&legend, spec, theme)
}

fn draw_pie_panel<DB: DrawingBackend>(
    cell: &DrawingArea<DB, Shift>,
    panel: &Panel,
    theme: &ResolvedTheme,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let (w, h) = cell.dim_in_pixel();
    let (w, h) = (w as i32, h as i32);

    let mut top = 0;
    if let Some(title) = &panel.title {
        if let Some(strip) = &theme.strip_background {
            draw_rect(cell, (4, 2), (w - 4, STRIP_HEIGHT), strip)?;
        }
        draw_centered(cell, title, (w / 2, STRIP_HEIGHT / 2 + 1), &theme.strip_text)?;
        top = STRIP_HEIGHT;
    }

    let center = (w / 2, top + (h - top) / 2);
    // leave room for the annotation outside the pie
    let outer = (w.min(h - top) as f64 / 2.0) * 0.72;

    for layer in &panel.layers {
        match layer {
            Layer::Col { bars, outline, .. } => {
                draw_wedges(cell, bars, center, outer, color_or(outline, BLACK))?
            }
            Layer::Label { marks } => {
                for mark in marks {
                    draw_boxed_label(cell, mark, center, outer, &theme.legend_text)?;
                }
            }
            Layer::Text { marks } => {
                for mark in marks {
                    let at = polar_to_pixel(center, radial(mark.x, outer), mark.y);
                    draw_centered(cell, &mark.text, at, &theme.axis_title)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn draw_wedges<DB: DrawingBackend>(
    cell: &DrawingArea<DB, Shift>,
    bars: &[Bar],
    center: Px,
    outer: f64,
    outline: RGBColor,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    for bar in bars {
        let points = wedge_points(center, outer, bar.ymin, bar.ymax);
        let fill = color_or(&bar.fill, RGBColor(128, 128, 128));
        cell.draw(&Polygon::new(points.clone(), fill.filled()))
            .context("Failed to draw pie slice")?;

        let mut closed = points;
        closed.push(center);
        cell.draw(&PathElement::new(closed, outline.stroke_width(1)))
            .context("Failed to draw pie slice outline")?;
    }
    Ok(())
}

fn draw_boxed_label<DB: DrawingBackend>(
    cell: &DrawingArea<DB, Shift>,
    mark: &TextMark,
    center: Px,
    outer: f64,
    text: &ResolvedText,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let at = polar_to_pixel(center, radial(mark.x, outer), mark.y);
    let longest = mark.text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
    let half_w = (longest as f64 * font_px(text) * 0.3).ceil() as i32 + 4;
    let half_h = text_block_height(&mark.text, text) / 2 + 2;

    let boxed = ResolvedRect {
        fill: RGBColor(255, 255, 255),
        border_color: Some(RGBColor(0, 0, 0)),
        border_width: 1.0,
    };
    draw_rect(cell, (at.0 - half_w, at.1 - half_h), (at.0 + half_w, at.1 + half_h), &boxed)?;
    draw_centered(cell, &mark.text, at, text)
}

fn draw_legend<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    theme: &ResolvedTheme,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let Some(scale) = &spec.fill_scale else {
        return Ok(());
    };
    let (_, h) = area.dim_in_pixel();
    let row = line_height(&theme.legend_text).max(18) + 4;
    let block = row * scale.breaks.len() as i32 + line_height(&theme.legend_title);
    let mut y = (h as i32 - block) / 2;

    if let Some(title) = &spec.labels.legend {
        draw_lines(area, title, (10, y), &theme.legend_title, HPos::Left)?;
        y += text_block_height(title, &theme.legend_title) + 4;
    }
    for (level, color) in scale.breaks.iter().zip(&scale.colors) {
        let fill = color_or(color, RGBColor(128, 128, 128));
        area.draw(&Rectangle::new([(10, y), (26, y + 16)], fill.filled()))
            .context("Failed to draw legend key")?;
        area.draw(&Rectangle::new([(10, y), (26, y + 16)], BLACK.stroke_width(1)))
            .context("Failed to draw legend key")?;
        area.draw(&Text::new(
            level.clone(),
            (32, y + 8),
            text_style(&theme.legend_text, HPos::Left, VPos::Center),
        ))
        .context("Failed to draw legend label")?;
        y += row;
    }
    Ok(())
}

// === Dot ===

const DOT_Y_LABEL_AREA: i32 = 110;
const DOT_RIGHT_LABEL_AREA: i32 = 70;

/// Data range of the x axis: points and reference lines, padded by 5%
pub fn dot_x_domain(panel: &Panel) -> (f64, f64) {
    let xs: Vec<f64> = panel
        .layers
        .iter()
        .flat_map(|layer| match layer {
            Layer::Point { points, .. } => points.iter().map(|p| p.x).collect(),
            Layer::VLine { x, .. } => vec![*x],
            _ => Vec::new(),
        })
        .collect();
    let min = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() {
        return (0.0, 1.0);
    }
    if min == max {
        return (min - 1.0, max + 1.0);
    }
    let padding = (max - min) * 0.05;
    (min - padding, max + padding)
}

/// Label of the break at `y`, empty between breaks
pub fn break_label(axis: &AxisSpec, y: f64) -> String {
    axis.breaks
        .iter()
        .position(|b| (b - y).abs() < 1e-6)
        .and_then(|i| axis.labels.get(i))
        .cloned()
        .unwrap_or_default()
}

fn font_style(text: &ResolvedText) -> TextStyle<'_> {
    let style = match text.face {
        FontFace::Plain => FontStyle::Normal,
        FontFace::Italic => FontStyle::Italic,
        FontFace::Bold | FontFace::BoldItalic => FontStyle::Bold,
    };
    FontDesc::new(FontFamily::from(text.family.as_str()), font_px(text), style).color(&text.color)
}

fn line_style(line: &ResolvedLine) -> ShapeStyle {
    line.color.stroke_width(line.width.max(1.0) as u32)
}

/// Major and minor grid styles; an unset line is drawn fully transparent
fn grid_styles(theme: &ResolvedTheme) -> (ShapeStyle, ShapeStyle) {
    let hidden = BLACK.mix(0.0).stroke_width(1);
    (
        theme.panel_grid_major.as_ref().map_or(hidden, line_style),
        theme.panel_grid_minor.as_ref().map_or(hidden, line_style),
    )
}

fn draw_dot_chart<DB: DrawingBackend>(
    body: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    theme: &ResolvedTheme,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let Some(panel) = spec.panels.first() else {
        anyhow::bail!("Cannot draw dot chart with no panels");
    };
    let Some(y_axis) = &spec.y_axis else {
        anyhow::bail!("Dot chart is missing its rank axis");
    };
    let secondary = spec.secondary_y_axis.as_ref().unwrap_or(y_axis);

    let (x0, x1) = dot_x_domain(panel);
    let (y0, y1) = y_axis.limits;

    let mut chart = ChartBuilder::on(body)
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(DOT_Y_LABEL_AREA)
        .right_y_label_area_size(DOT_RIGHT_LABEL_AREA)
        .build_cartesian_2d(x0..x1, y0..y1)
        .context("Failed to build chart")?
        .set_secondary_coord(x0..x1, y0..y1);

    chart
        .plotting_area()
        .fill(&theme.panel_background.fill)
        .context("Failed to fill panel")?;

    let hidden = BLACK.mix(0.0).stroke_width(1);
    let primary_labels = |y: &f64| break_label(y_axis, *y);
    let secondary_labels = |y: &f64| break_label(secondary, *y);
    let n_breaks = y_axis.breaks.len() + 1;
    let (major_grid, minor_grid) = grid_styles(theme);

    {
        let mut mesh = chart.configure_mesh();
        mesh.y_labels(n_breaks)
            .y_label_formatter(&primary_labels)
            .x_labels(6)
            .label_style(font_style(&theme.axis_text))
            .axis_desc_style(font_style(&theme.axis_title))
            .bold_line_style(major_grid)
            .light_line_style(minor_grid)
            .axis_style(theme.axis_line.as_ref().map_or(hidden, line_style));
        if let Some(x_title) = &spec.labels.x {
            mesh.x_desc(x_title.as_str());
        }
        if let Some(y_title) = &y_axis.title {
            mesh.y_desc(y_title.as_str());
        }
        mesh.draw().context("Failed to draw mesh")?;
    }

    {
        let mut axes = chart.configure_secondary_axes();
        axes.y_labels(n_breaks)
            .y_label_formatter(&secondary_labels)
            .label_style(font_style(&theme.axis_text))
            .axis_desc_style(font_style(&theme.axis_title))
            .axis_style(theme.axis_line.as_ref().map_or(hidden, line_style));
        if let Some(title) = &secondary.title {
            axes.y_desc(title.as_str());
        }
        axes.draw().context("Failed to draw percentile axis")?;
    }

    if let Some(border) = theme.panel_background.border_color {
        let width = theme.panel_background.border_width.max(1.0) as u32;
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(x0, y0), (x1, y1)],
                border.stroke_width(width),
            )))
            .context("Failed to draw panel border")?;
    }

    for layer in &panel.layers {
        match layer {
            Layer::Point { color, size, points } => {
                let fill = color_or(color, BLACK);
                let radius = size.round() as i32;
                chart
                    .draw_series(points.iter().map(|p| Circle::new((p.x, p.y), radius, fill.filled())))
                    .context("Failed to draw points")?;
            }
            Layer::VLine { x, color, linetype, label } => {
                let style = color_or(color, BLACK).stroke_width(1);
                let ends = vec![(*x, y0), (*x, y1)];
                match linetype {
                    LineType::Solid => chart.draw_series(LineSeries::new(ends, style)),
                    LineType::Dashed => chart.draw_series(DashedLineSeries::new(ends, 8, 5, style)),
                    LineType::Dotted => chart.draw_series(DashedLineSeries::new(ends, 2, 4, style)),
                }
                .context("Failed to draw reference line")?;

                if let Some(label) = label {
                    chart
                        .draw_series(std::iter::once(
                            EmptyElement::at((*x, y1))
                                + Text::new(label.clone(), (4, 4), font_style(&theme.axis_text)),
                        ))
                        .context("Failed to draw reference line label")?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}
