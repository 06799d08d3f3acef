pub mod property_test_detector;

pub use property_test_detector::PropertyTestDetector;
