use anyhow::Result;
use plotters::prelude::*;

// Sanity-check the SVG backend used for chart artifacts: it must render
// shapes and caption text without any native font machinery.
#[test]
fn svg_backend_renders_without_native_fonts() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("probe.svg");
    {
        let root = SVGBackend::new(&path, (400, 300)).into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .caption("probe", ("sans-serif", 20))
            .margin(5)
            .x_label_area_size(30)
            .y_label_area_size(30)
            .build_cartesian_2d(0f64..3f64, 0f64..3f64)?;
        chart.configure_mesh().draw()?;
        chart.draw_series(LineSeries::new(vec![(0.0, 0.0), (2.0, 2.0)], &BLUE))?;
        chart.draw_series([Circle::new((1.0, 2.0), 4, RED.filled())])?;
        root.present()?;
    }

    let svg = std::fs::read_to_string(&path)?;
    assert!(svg.contains("<svg"));
    assert!(svg.contains("probe"));
    Ok(())
}
