//! QC 报告用的简单 SVG 图表。

use anyhow::{Context, Result};
use std::path::Path;
use svg::node::element::path::Data;
use svg::node::element::{Element, Path as SvgPath, Rectangle};
use svg::node::Text;
use svg::{Document, Node};

#[derive(Debug, Clone)]
pub struct PlotStyle {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub font_size: f32,
    pub color: String,
    pub background_color: String,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 400.0,
            margin: 50.0,
            font_size: 12.0,
            color: "#1f77b4".to_string(),
            background_color: "white".to_string(),
        }
    }
}

struct Canvas {
    document: Document,
    s: PlotStyle,
}

impl Canvas {
    fn new(s: &PlotStyle, title: &str) -> Self {
        let document = Document::new()
            .set("viewBox", (0, 0, s.width, s.height))
            .set("width", s.width)
            .set("height", s.height)
            .set("style", format!("background-color:{}", s.background_color));
        let mut canvas = Self { document, s: s.clone() };
        canvas.text(s.width / 2.0, s.margin / 2.0, title, "middle");
        canvas
    }

    fn plot_width(&self) -> f32 {
        self.s.width - 2.0 * self.s.margin
    }

    fn plot_height(&self) -> f32 {
        self.s.height - 2.0 * self.s.margin
    }

    fn baseline(&self) -> f32 {
        self.s.height - self.s.margin
    }

    fn text(&mut self, x: f32, y: f32, content: &str, anchor: &str) {
        let mut element = Element::new("text");
        element.assign("x", x);
        element.assign("y", y);
        element.assign("fill", "black");
        element.assign("text-anchor", anchor);
        element.assign("font-size", format!("{}px", self.s.font_size));
        element.append(Text::new(content));
        self.document.append(element);
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: &str, dashed: bool) {
        let data = Data::new().move_to(from).line_to(to);
        let mut path = SvgPath::new()
            .set("fill", "none")
            .set("stroke", color)
            .set("stroke-width", 1)
            .set("d", data);
        if dashed {
            path.assign("stroke-dasharray", "4,3");
        }
        self.document.append(path);
    }

    fn axes(&mut self, x_label: &str, y_label: &str, y_max: f64) {
        let (m, base) = (self.s.margin, self.baseline());
        let right = m + self.plot_width();
        self.line((m, base), (right, base), "black", false);
        self.line((m, base), (m, m), "black", false);
        self.text(m - 4.0, base, "0", "end");
        self.text(m - 4.0, m + self.s.font_size / 2.0, &format_tick(y_max), "end");
        self.text(m + self.plot_width() / 2.0, self.s.height - m / 4.0, x_label, "middle");
        self.text(m, m - 6.0, y_label, "start");
    }

    fn save(&self, path: &Path) -> Result<()> {
        svg::save(path, &self.document).with_context(|| format!("cannot write plot '{}'", path.display()))
    }
}

fn format_tick(v: f64) -> String {
    if v >= 100.0 || v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

/// 折线图；`markers` 为 (x 下标, 标签) 的竖虚线，用于标出 contig 边界
pub fn line_plot(
    path: &Path,
    title: &str,
    values: &[f64],
    markers: &[(usize, String)],
    labels: (&str, &str),
    style: &PlotStyle,
) -> Result<()> {
    let mut c = Canvas::new(style, title);
    let y_max = values.iter().copied().fold(0.0f64, f64::max).max(1.0);
    c.axes(labels.0, labels.1, y_max);

    let n = values.len().max(1);
    let (m, base, w, h) = (style.margin, c.baseline(), c.plot_width(), c.plot_height());
    let x_of = |i: usize| m + w * i as f32 / n as f32;
    let y_of = |v: f64| base - h * (v / y_max) as f32;

    for (i, name) in markers {
        let x = x_of(*i);
        c.line((x, base), (x, m), "#999999", true);
        c.text(x + 2.0, m + style.font_size, name, "start");
    }

    if let Some(&first) = values.first() {
        let mut data = Data::new().move_to((x_of(0), y_of(first)));
        for (i, &v) in values.iter().enumerate() {
            data = data.line_to((x_of(i), y_of(v))).line_to((x_of(i + 1), y_of(v)));
        }
        let curve = SvgPath::new()
            .set("fill", "none")
            .set("stroke", style.color.as_str())
            .set("stroke-width", 1.5)
            .set("d", data);
        c.document.append(curve);
    }
    c.save(path)
}

/// 柱状图，每个柱子一个标签；标签过多时只每隔若干个标注一次
pub fn bar_plot(
    path: &Path,
    title: &str,
    labels: &[String],
    counts: &[u64],
    axis_labels: (&str, &str),
    style: &PlotStyle,
) -> Result<()> {
    let mut c = Canvas::new(style, title);
    let y_max = counts.iter().copied().max().unwrap_or(0).max(1) as f64;
    c.axes(axis_labels.0, axis_labels.1, y_max);

    let n = counts.len().max(1);
    let (m, base, w, h) = (style.margin, c.baseline(), c.plot_width(), c.plot_height());
    let bar_w = w / n as f32;
    let label_every = (n / 20).max(1);

    for (i, &count) in counts.iter().enumerate() {
        let x = m + bar_w * i as f32;
        let bar_h = h * (count as f64 / y_max) as f32;
        let bar = Rectangle::new()
            .set("x", x)
            .set("y", base - bar_h)
            .set("width", (bar_w - 1.0).max(0.5))
            .set("height", bar_h)
            .set("fill", style.color.as_str());
        c.document.append(bar);
        if i % label_every == 0 || i + 1 == counts.len() {
            if let Some(label) = labels.get(i) {
                c.text(x + bar_w / 2.0, base + style.font_size + 2.0, label, "middle");
            }
        }
    }
    c.save(path)
}
