//! The single HTML page: a form generated from the feature schema.

use crate::schema::FeatureSchema;
use maud::{html, Markup, PreEscaped, DOCTYPE};

const STYLE: &str = "
body { font-family: system-ui, sans-serif; max-width: 40rem; margin: 2rem auto; color: #2b2b2b; }
form { display: grid; grid-template-columns: 1fr 12rem; gap: .5rem 1rem; align-items: center; }
button { grid-column: 2; padding: .4rem; }
.error { background: #fdecea; border: 1px solid #f5c2c0; padding: .75rem; border-radius: 4px; }
#result { margin-top: 1.5rem; font-size: 1.2rem; }
";

// Posts the form as urlencoded data and renders the JSON reply.
const SCRIPT: &str = "
document.getElementById('predict-form').addEventListener('submit', async (ev) => {
  ev.preventDefault();
  const out = document.getElementById('result');
  const body = new URLSearchParams(new FormData(ev.target));
  try {
    const resp = await fetch('/predict', { method: 'POST', body });
    const data = await resp.json();
    out.textContent = data.success
      ? 'Predicted daily revenue: ' + data.prediction.toFixed(2)
      : 'Error: ' + data.error;
  } catch (err) {
    out.textContent = 'Error: ' + err;
  }
});
";

fn label(field: &str) -> String { field.replace('_', " ") }

pub fn index_page(schema: &FeatureSchema, load_error: Option<&str>) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { "Coffee Shop Revenue Predictor" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                h1 { "Coffee Shop Revenue Predictor" }
                @if let Some(err) = load_error {
                    div class="error" {
                        strong { "Model unavailable. " }
                        (err)
                    }
                }
                form id="predict-form" method="post" action="/predict" {
                    @for field in schema.fields() {
                        label for=(field) { (label(field)) }
                        input type="number" step="any" id=(field) name=(field) required;
                    }
                    button type="submit" { "Predict" }
                }
                div id="result" {}
                script { (PreEscaped(SCRIPT)) }
            }
        }
    }
}
