use plotters::prelude::*;
use plotters_canvas::CanvasBackend;
use web_sys::HtmlCanvasElement;
use yew::prelude::*;

use crate::core::analytics::MonthBucket;

#[derive(Properties, PartialEq)]
pub struct TrendChartProps {
    /// Exactly twelve buckets, January first.
    pub buckets: Vec<MonthBucket>,
}

pub enum Msg {}

/// Year-at-a-glance chart: one line series for targets, one for
/// collections, drawn over all twelve months.
pub struct TrendChart {
    canvas_ref: NodeRef,
}

impl Component for TrendChart {
    type Message = Msg;
    type Properties = TrendChartProps;

    fn create(_ctx: &Context<Self>) -> Self {
        Self {
            canvas_ref: NodeRef::default(),
        }
    }

    fn changed(&mut self, ctx: &Context<Self>, old_props: &Self::Properties) -> bool {
        if ctx.props().buckets != old_props.buckets {
            self.draw(&ctx.props().buckets);
        }
        true
    }

    fn rendered(&mut self, ctx: &Context<Self>, _first_render: bool) {
        self.draw(&ctx.props().buckets);
    }

    fn view(&self, _ctx: &Context<Self>) -> Html {
        html! {
            <div class="trend-chart">
                <h3 class="chart-title">{"Monthly Target vs Collection"}</h3>
                <canvas
                    ref={self.canvas_ref.clone()}
                    class="trend-chart-canvas"
                    width="800"
                    height="350"
                ></canvas>
            </div>
        }
    }
}

impl TrendChart {
    fn draw(&self, buckets: &[MonthBucket]) {
        if buckets.is_empty() {
            return;
        }

        let canvas = match self.canvas_ref.cast::<HtmlCanvasElement>() {
            Some(canvas) => canvas,
            None => return,
        };
        canvas.set_width(800);
        canvas.set_height(350);

        let backend = match CanvasBackend::with_canvas_object(canvas) {
            Some(backend) => backend,
            None => return,
        };
        let root = backend.into_drawing_area();
        if root.fill(&WHITE).is_err() {
            return;
        }

        let max_value = buckets
            .iter()
            .flat_map(|b| [b.target, b.collection])
            .fold(0.0f64, f64::max)
            .max(1.0);
        let y_max = max_value * 1.1;

        let mut chart = match ChartBuilder::on(&root)
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(70)
            .build_cartesian_2d(1u32..12u32, 0.0..y_max)
        {
            Ok(chart) => chart,
            Err(_) => return,
        };

        if chart
            .configure_mesh()
            .y_desc("Amount")
            .x_desc("Month")
            .x_labels(12)
            .x_label_formatter(&|m| shared::month_name(*m)[..3].to_string())
            .label_style(("sans-serif", 12, &RGBColor(102, 126, 234)))
            .axis_style(&RGBColor(230, 230, 230))
            .bold_line_style(&RGBColor(245, 245, 245))
            .draw()
            .is_err()
        {
            return;
        }

        let target_color = RGBColor(102, 126, 234);
        let collection_color = RGBColor(72, 187, 120);

        let target_series = chart.draw_series(LineSeries::new(
            buckets.iter().map(|b| (b.month, b.target)),
            target_color.stroke_width(3),
        ));
        if let Ok(series) = target_series {
            series
                .label("Target")
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], target_color.stroke_width(3))
                });
        }

        let collection_series = chart.draw_series(LineSeries::new(
            buckets.iter().map(|b| (b.month, b.collection)),
            collection_color.stroke_width(3),
        ));
        if let Ok(series) = collection_series {
            series
                .label("Collection")
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], collection_color.stroke_width(3))
                });
        }

        for bucket in buckets {
            let _ = chart.draw_series(std::iter::once(Circle::new(
                (bucket.month, bucket.target),
                4,
                target_color.filled(),
            )));
            let _ = chart.draw_series(std::iter::once(Circle::new(
                (bucket.month, bucket.collection),
                4,
                collection_color.filled(),
            )));
        }

        if chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(RGBColor(230, 230, 230))
            .draw()
            .is_err()
        {
            return;
        }

        let _ = root.present();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_handles_empty_buckets() {
        let chart = TrendChart {
            canvas_ref: NodeRef::default(),
        };
        chart.draw(&[]);
    }

    #[test]
    fn draw_without_canvas_is_a_noop() {
        let chart = TrendChart {
            canvas_ref: NodeRef::default(),
        };
        let buckets = vec![MonthBucket {
            month: 1,
            name: "January",
            target: 100.0,
            collection: 50.0,
            achievement_percent: 50,
        }];
        chart.draw(&buckets);
    }
}
