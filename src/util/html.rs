/// Make a JSON document safe to inline inside a `<script>` element.
///
/// Only `</` can terminate the element early; `<\/` is an equivalent JSON string escape.
pub fn script_safe_json(json: &str) -> String {
    json.replace("</", "<\\/")
}
