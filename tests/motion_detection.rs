use edge_motion::core_modules::contour_merger::ContourMerger;
use edge_motion::core_modules::filter_bank::EdgeFilterBank;
use edge_motion::core_modules::frame_differencer::FrameDifferencer;
use edge_motion::{
    DiffPolicy, FilterConfiguration, IterFrameSource, MotionPipeline, NoProgress, ParallelPipeline,
    PipelineConfig, StructuringElement,
};
use image::{GrayImage, Luma, Rgb, RgbImage};

fn square_frame(left: u32, top: u32) -> RgbImage {
    RgbImage::from_fn(96, 96, |x, y| {
        let inside = (left..left + 24).contains(&x) && (top..top + 24).contains(&y);
        if inside { Rgb([230, 230, 230]) } else { Rgb([20, 20, 20]) }
    })
}

fn test_config() -> PipelineConfig {
    PipelineConfig {
        min_contour_pixel_count: 100,
        workers: Some(3),
        ..PipelineConfig::default()
    }
}

#[test]
fn stages_compose_into_a_single_moving_object() {
    let bank = EdgeFilterBank::new(FilterConfiguration::default()).expect("valid filter config");
    let mut differencer = FrameDifferencer::new(2, DiffPolicy::ExactMatch).expect("valid window");

    let before = bank
        .detect_edges(&square_frame(20, 30))
        .expect("edges")
        .into_final_edge_map()
        .expect("final map");
    let after = bank
        .detect_edges(&square_frame(30, 30))
        .expect("edges")
        .into_final_edge_map()
        .expect("final map");

    let border = bank.border();
    assert_eq!(before.dimensions(), (96 - 2 * border, 96 - 2 * border));

    differencer.push(before).expect("first map");
    let mask = differencer.push(after).expect("same size");
    assert!(mask.as_raw().iter().any(|&v| v != 0));

    let merger = ContourMerger::with_workers(1, 4).expect("pool");
    let contours = merger.scan(&mask);
    let total: usize = contours.iter().map(|c| c.len()).sum();
    assert_eq!(total, mask.as_raw().iter().filter(|&&v| v != 0).count());
}

#[test]
fn sequential_run_boxes_every_moving_frame() {
    let frames: Vec<RgbImage> = (0..5).map(|i| square_frame(20 + 6 * i, 30)).collect();
    let mut pipeline = MotionPipeline::new(test_config()).expect("valid config");
    let mut sink: Vec<RgbImage> = Vec::new();

    let summary = pipeline
        .run(&mut IterFrameSource::new(frames), &mut sink, &mut NoProgress)
        .expect("run");

    assert_eq!(summary.frames_processed, 5);
    assert_eq!(sink.len(), 5);
    assert!(summary.boxes_drawn >= 4);

    let green = |frame: &RgbImage| frame.pixels().filter(|p| p.0 == [0, 255, 0]).count();
    assert_eq!(green(&sink[0]), 0);
    assert!(sink[1..].iter().all(|f| green(f) > 0));
}

#[tokio::test]
async fn parallel_and_sequential_pipelines_agree() {
    let positions = [20, 26, 32, 38];

    let mut sequential = MotionPipeline::new(test_config()).expect("valid config");
    let parallel = ParallelPipeline::new(test_config()).expect("valid config");

    for left in positions {
        let expected = sequential.process_frame(square_frame(left, 30)).expect("frame");
        let report = parallel.process_frame(square_frame(left, 30)).await.expect("frame");
        assert_eq!(report.frame_index, expected.frame_index);
        assert_eq!(report.boxes, expected.boxes);
        assert_eq!(report.contour_count, expected.contour_count);
        assert_eq!(report.frame, expected.frame);
    }
    parallel.shutdown().await.expect("clean shutdown");
}

#[test]
fn worker_count_does_not_change_the_boxes() {
    let frames: Vec<RgbImage> = (0..3).map(|i| square_frame(20 + 8 * i, 25 + 4 * i)).collect();
    let mut reference = None;
    for workers in [1, 2, 8] {
        let config = PipelineConfig { workers: Some(workers), ..test_config() };
        let mut pipeline = MotionPipeline::new(config).expect("valid config");
        let boxes: Vec<_> = frames
            .iter()
            .map(|f| pipeline.process_frame(f.clone()).expect("frame").boxes)
            .collect();
        match &reference {
            None => reference = Some(boxes),
            Some(expected) => assert_eq!(&boxes, expected, "workers = {workers}"),
        }
    }
}

#[test]
fn custom_morphology_is_used_for_cleanup() {
    use edge_motion::MorphologicalOps;

    /// Blanks every mask, so nothing can ever be detected.
    struct Blank;

    impl MorphologicalOps for Blank {
        fn dilate(&self, mask: &GrayImage, _: StructuringElement) -> GrayImage {
            GrayImage::from_pixel(mask.width(), mask.height(), Luma([0]))
        }

        fn open(&self, mask: &GrayImage, _: StructuringElement) -> GrayImage {
            mask.clone()
        }
    }

    let mut pipeline = MotionPipeline::with_morphology(test_config(), Box::new(Blank)).expect("valid config");
    pipeline.process_frame(square_frame(20, 30)).expect("frame");
    let report = pipeline.process_frame(square_frame(40, 30)).expect("frame");
    assert_eq!(report.contour_count, 0);
    assert!(report.boxes.is_empty());
}

#[cfg(feature = "serde")]
#[test]
fn config_round_trips_through_json_with_defaults_filled_in() {
    let json = r#"{
        "min_contour_pixel_count": 250,
        "diff_policy": "MagnitudeAverage",
        "structuring_element": { "Diamond": 2 },
        "filter": { "gaussian_radius": 3 }
    }"#;
    let config: PipelineConfig = serde_json::from_str(json).expect("valid json");
    assert_eq!(config.min_contour_pixel_count, 250);
    assert_eq!(config.diff_policy, DiffPolicy::MagnitudeAverage);
    assert_eq!(config.structuring_element, StructuringElement::Diamond(2));
    assert_eq!(config.filter.gaussian_radius, 3);
    assert_eq!(config.filter.gaussian_intensity, FilterConfiguration::default().gaussian_intensity);
    assert_eq!(config.diff_frame_window_size, 4);
    config.validate().expect("valid");

    let encoded = serde_json::to_string(&config).expect("serializable");
    let decoded: PipelineConfig = serde_json::from_str(&encoded).expect("round trip");
    assert_eq!(decoded, config);
}
