//! Display model for a prediction.

use crate::model::PredictionResult;

/// Confidence as a percentage with two decimals, e.g. `0.8734` -> `"87.34%"`.
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.2}%", confidence * 100.0)
}

/// What the result panel shows.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionView {
    pub class_name: String,
    pub confidence: String,
    pub disease_info: String,
    pub treatments: Vec<String>,
}

impl PredictionView {
    /// Markdown for terminal display; treatments stay in the order received.
    pub fn to_markdown(&self) -> String {
        let mut out = format!(
            "## Predicted Disease: {}\n\n**Confidence:** {}\n",
            self.class_name, self.confidence
        );
        if !self.disease_info.is_empty() {
            out.push_str("\n### Disease Information\n\n");
            out.push_str(&self.disease_info);
            out.push('\n');
        }
        if !self.treatments.is_empty() {
            out.push_str("\n### Treatments\n\n");
            for treatment in &self.treatments {
                out.push_str("* ");
                out.push_str(treatment);
                out.push('\n');
            }
        }
        out
    }
}

/// `None` means no result panel at all.
pub fn render(prediction: Option<&PredictionResult>) -> Option<PredictionView> {
    prediction.map(|p| PredictionView {
        class_name: p.class_name.clone(),
        confidence: format_confidence(p.confidence),
        disease_info: p.disease_info.clone(),
        treatments: p.treatments.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_rounds_to_two_decimals() {
        assert_eq!(format_confidence(0.0), "0.00%");
        assert_eq!(format_confidence(0.5), "50.00%");
        assert_eq!(format_confidence(0.8734), "87.34%");
        assert_eq!(format_confidence(0.99999), "100.00%");
        assert_eq!(format_confidence(1.0), "100.00%");
    }

    #[test]
    fn nothing_to_show_without_prediction() {
        assert_eq!(render(None), None);
    }

    #[test]
    fn treatments_keep_their_order() {
        let prediction = PredictionResult {
            class_name: "Grape___Black_rot".to_string(),
            confidence: 0.912,
            disease_info: "Fungal infection of leaves and fruit.".to_string(),
            treatments: vec![
                "Remove mummified berries".to_string(),
                "Improve air circulation".to_string(),
                "Apply myclobutanil".to_string(),
            ],
        };
        let view = render(Some(&prediction)).unwrap();
        assert_eq!(view.confidence, "91.20%");

        let markdown = view.to_markdown();
        let first = markdown.find("Remove mummified").unwrap();
        let second = markdown.find("Improve air").unwrap();
        let third = markdown.find("Apply myclobutanil").unwrap();
        assert!(first < second && second < third);
        assert!(markdown.contains("**Confidence:** 91.20%"));
    }
}
