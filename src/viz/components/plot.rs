use ratatui::{prelude::*, style::Stylize, widgets::*};

fn labels(bounds: [f64; 2]) -> Vec<String> {
    bounds.iter().map(|x| format!("{x:.2}")).collect()
}

/// A line chart of one metric over episodes
pub struct Plot {
    title: &'static str,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    /// Fixed y bounds, otherwise the bounds grow with the data
    y_fixed: bool,
    data: Vec<(f64, f64)>,
}

impl Plot {
    pub fn new(title: &'static str) -> Self {
        Self {
            title,
            x_bounds: [0.0, 1.0],
            y_bounds: [f64::MAX, f64::MIN],
            y_fixed: false,
            data: Vec::new(),
        }
    }

    pub fn with_x_bounds(mut self, x_bounds: [f64; 2]) -> Self {
        self.x_bounds = x_bounds;
        self
    }

    /// Pin the y axis, e.g. to the range chosen by a [`ScoreScale`](crate::telemetry::ScoreScale)
    pub fn set_y_bounds(&mut self, y_bounds: [f64; 2]) {
        self.y_bounds = y_bounds;
        self.y_fixed = true;
    }

    pub fn update(&mut self, point: (f64, f64)) {
        self.x_bounds[0] = self.x_bounds[0].min(point.0);
        self.x_bounds[1] = self.x_bounds[1].max(point.0);
        if !self.y_fixed {
            self.y_bounds[0] = self.y_bounds[0].min(point.1);
            self.y_bounds[1] = self.y_bounds[1].max(point.1);
        }
        self.data.push(point);
    }

    /// Replace the data, e.g. after a reset
    pub fn replace(&mut self, data: Vec<(f64, f64)>) {
        self.data.clear();
        if !self.y_fixed {
            self.y_bounds = [f64::MAX, f64::MIN];
        }
        for point in data {
            self.update(point);
        }
    }
}

impl Widget for &Plot {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let dataset = Dataset::default()
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .cyan()
            .data(&self.data);

        // An empty plot still needs a valid range
        let y_bounds = if self.y_bounds[0] <= self.y_bounds[1] {
            self.y_bounds
        } else {
            [0.0, 1.0]
        };

        let x_axis = Axis::default()
            .title("Episode")
            .dark_gray()
            .labels(labels(self.x_bounds).into_iter().map(|l| l.bold()).collect())
            .bounds(self.x_bounds);

        let y_axis = Axis::default()
            .title(self.title)
            .dark_gray()
            .labels(labels(y_bounds).into_iter().map(|l| l.bold()).collect())
            .bounds(y_bounds);

        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title(self.title)
            .padding(Padding::uniform(1));

        Chart::new(vec![dataset])
            .block(block)
            .x_axis(x_axis)
            .y_axis(y_axis)
            .render(area, buf);
    }
}

/// Selectable set of [`Plot`]s
pub struct Plots {
    plots: Vec<Plot>,
    selected: usize,
}

impl Plots {
    pub fn new(plots: Vec<Plot>) -> Self {
        Self { plots, selected: 0 }
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Plot> {
        self.plots.get_mut(index)
    }

    pub fn next_plot(&mut self) {
        self.selected = (self.selected + 1) % self.plots.len().max(1);
    }

    pub fn prev_plot(&mut self) {
        let len = self.plots.len().max(1);
        self.selected = (self.selected + len - 1) % len;
    }
}

impl Widget for &Plots {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [tabs_area, plot_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]).areas(area);

        Tabs::new(self.plots.iter().map(|p| p.title))
            .white()
            .highlight_style(Style::default().light_green())
            .select(self.selected)
            .render(tabs_area, buf);

        if let Some(plot) = self.plots.get(self.selected) {
            plot.render(plot_area, buf);
        }
    }
}
