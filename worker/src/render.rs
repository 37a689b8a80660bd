use std::collections::VecDeque;

const WINDOW: usize = 100;
const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Rolling window over the most recent value estimates, drawn as a text sparkline.
#[derive(Debug, Default)]
pub struct ValuePlot {
    values: VecDeque<f32>,
}

impl ValuePlot {
    pub fn new() -> Self {
        Self {
            values: VecDeque::with_capacity(WINDOW),
        }
    }

    /// Appends a value, evicting the oldest one once the window is full.
    pub fn push(&mut self, value: f32) {
        if self.values.len() == WINDOW {
            self.values.pop_front();
        }

        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Draws the window scaled between its own minimum and maximum.
    pub fn sparkline(&self) -> String {
        let (lo, hi) = self
            .values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });

        let span = hi - lo;
        let top = (BARS.len() - 1) as f32;

        self.values
            .iter()
            .map(|&v| {
                let level = if span > 0. { (v - lo) / span * top } else { 0. };
                BARS[level.round() as usize]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_the_last_hundred_values() {
        let mut plot = ValuePlot::new();
        for i in 0..150 {
            plot.push(i as f32);
        }

        assert_eq!(plot.len(), WINDOW);
        assert_eq!(plot.values.front(), Some(&50.));
    }

    #[test]
    fn sparkline_spans_the_window() {
        let mut plot = ValuePlot::new();
        for v in [0., 1., 2., 3., 4., 5., 6., 7.] {
            plot.push(v);
        }

        assert_eq!(plot.sparkline(), "▁▂▃▄▅▆▇█");
    }

    #[test]
    fn flat_window_draws_the_floor() {
        let mut plot = ValuePlot::new();
        plot.push(3.);
        plot.push(3.);

        assert_eq!(plot.sparkline(), "▁▁");
    }
}
