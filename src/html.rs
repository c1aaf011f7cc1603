//! The map page served at `/`.
//!
//! The page is a single embedded template: a sidebar with the layer and
//! severity selectors, and a Leaflet map that asks `/api/overlay` for one
//! render pass whenever the selection changes.

use crate::config::MapConfig;
use crate::types::LayerMode;

const INDEX_HTML: &str = r##"<!doctype html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>

  <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.css" crossorigin="anonymous"
    referrerpolicy="no-referrer" />
  <script src="https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.js" crossorigin="anonymous"
    referrerpolicy="no-referrer"></script>

  <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.4.1/dist/MarkerCluster.css" />
  <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.4.1/dist/MarkerCluster.Default.css" />
  <script src="https://unpkg.com/leaflet.markercluster@1.4.1/dist/leaflet.markercluster.js"></script>
  <script src="https://unpkg.com/leaflet.heat@0.2.0/dist/leaflet-heat.js"></script>

  <style>
    body { margin: 0; font-family: system-ui, sans-serif; display: flex; }
    #sidebar { flex: 1; min-width: 220px; max-width: 320px; padding: 1rem 1.25rem; box-sizing: border-box;
      display: flex; flex-direction: column; }
    #sidebar h1 { font-size: 1.6rem; margin-top: 0; }
    #sidebar label { display: block; margin: 1rem 0 0.35rem; font-size: 0.9rem; }
    #sidebar select { width: 100%; padding: 0.35rem; }
    #severity-group[hidden] { display: none; }
    #status { margin-top: 1rem; font-size: 0.85rem; color: #555; }
    #error { margin-top: 1rem; padding: 0.6rem; background: #fde2e1; color: #8a1c17; border-radius: 4px; }
    #error[hidden] { display: none; }
    #footer { margin-top: auto; padding-top: 1rem; border-top: 1px solid #ddd; font-size: 0.85rem; }
    #map { width: {{WIDTH}}px; height: {{HEIGHT}}px; flex: 4; }
    .distress-marker { width: 14px; height: 14px; border-radius: 50%; border: 2px solid #fff;
      box-shadow: 0 0 4px rgba(0, 0, 0, .5); }
    .distress-marker.red { background: #d63e2a; }
    .distress-marker.orange { background: #f69730; }
    .distress-marker.green { background: #72b026; }
  </style>
</head>

<body>
  <div id="sidebar">
    <h1>{{TITLE}}</h1>

    <label for="layer">Select layer</label>
    <select id="layer">
{{LAYER_OPTIONS}}
    </select>

    <div id="severity-group" hidden>
      <label for="severity">Select severity</label>
      <select id="severity"></select>
    </div>

    <div id="error" hidden></div>
    <div id="status"></div>

    <div id="footer">{{ATTRIBUTION}}</div>
  </div>
  <div id="map"></div>

  <script>
    const BY_SEVERITY = 'By Severity';
    const layerSelect = document.getElementById('layer');
    const severitySelect = document.getElementById('severity');
    const severityGroup = document.getElementById('severity-group');
    const errorBox = document.getElementById('error');
    const statusBox = document.getElementById('status');

    const map = L.map('map');
    L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
      maxZoom: 19,
      attribution: '&copy; OpenStreetMap contributors'
    }).addTo(map);

    let overlay = null;
    let centered = false;
    let severityChosen = false;
    // Only the latest pass may touch the map.
    let passSeq = 0;

    const escapeHtml = (value) => String(value)
      .replace(/&/g, '&amp;').replace(/</g, '&lt;').replace(/>/g, '&gt;')
      .replace(/"/g, '&quot;').replace(/'/g, '&#39;');

    function popupHtml(popup) {
      return popup.blocks.map((block) => {
        if (block.kind === 'media') {
          return `<iframe src="${escapeHtml(block.src)}" width="${block.width}px"></iframe><br>`;
        }
        return `<b>${escapeHtml(block.label)}:</b> ${escapeHtml(block.value)}<br>`;
      }).join('\n');
    }

    function markerFor(m) {
      const icon = L.divIcon({
        className: '',
        html: `<div class="distress-marker ${m.color}"></div>`,
        iconSize: [18, 18],
        iconAnchor: [9, 9]
      });
      return L.marker(m.position, { icon })
        .bindPopup(popupHtml(m.popup), { maxWidth: m.popup.width, maxHeight: m.popup.height });
    }

    function buildOverlay(o) {
      switch (o.kind) {
        case 'markers':
          return L.layerGroup(o.markers.map(markerFor));
        case 'cluster': {
          const group = L.markerClusterGroup();
          o.cluster.markers.forEach((m) => group.addLayer(markerFor(m)));
          return group;
        }
        case 'heatmap':
          return L.heatLayer(o.points);
        default:
          throw new Error(`unsupported overlay kind ${o.kind}`);
      }
    }

    function syncSeverityOptions(options, selected) {
      const previous = severitySelect.value;
      severitySelect.innerHTML = '';
      options.forEach((value) => {
        const opt = document.createElement('option');
        opt.value = value;
        opt.textContent = value;
        severitySelect.appendChild(opt);
      });
      if (selected !== null && options.includes(selected)) {
        severitySelect.value = selected;
      } else if (options.includes(previous)) {
        severitySelect.value = previous;
      }
    }

    async function renderPass() {
      const seq = ++passSeq;
      const params = new URLSearchParams({ layer: layerSelect.value });
      const bySeverity = layerSelect.value === BY_SEVERITY;
      severityGroup.hidden = !bySeverity;
      // An empty label is a real severity value, so it is sent as `severity=`.
      if (bySeverity && severityChosen) {
        params.set('severity', severitySelect.value);
      }

      let view;
      try {
        const resp = await fetch(`/api/overlay?${params}`);
        const body = await resp.json();
        if (!resp.ok) throw new Error(body.error || `HTTP ${resp.status}`);
        view = body;
      } catch (err) {
        if (seq !== passSeq) return;
        if (overlay) { map.removeLayer(overlay); overlay = null; }
        errorBox.textContent = `Could not render the map: ${err.message}`;
        errorBox.hidden = false;
        statusBox.textContent = '';
        return;
      }
      if (seq !== passSeq) return;
      errorBox.hidden = true;

      syncSeverityOptions(view.severity_options, view.selection.severity);
      if (bySeverity && view.selection.severity === null && view.severity_options.length > 0) {
        severityChosen = true;
        return renderPass();
      }

      if (!centered) {
        map.setView(view.center, view.zoom);
        centered = true;
      }
      if (overlay) map.removeLayer(overlay);
      overlay = buildOverlay(view.overlay);
      overlay.addTo(map);

      const shown = view.overlay.kind === 'heatmap' ? view.overlay.points.length
        : view.overlay.kind === 'cluster' ? view.overlay.cluster.markers.length
        : view.overlay.markers.length;
      statusBox.textContent = `${shown} distress points shown` +
        (view.skipped > 0 ? `, ${view.skipped} feed rows skipped` : '');
    }

    layerSelect.addEventListener('change', renderPass);
    severitySelect.addEventListener('change', () => { severityChosen = true; renderPass(); });
    map.setView([{{FALLBACK_LAT}}, {{FALLBACK_LON}}], {{ZOOM}});
    renderPass();
  </script>
</body>
</html>
"##;

/// Fills the page template from the map settings.
pub fn render_index(map: &MapConfig) -> String {
    let layer_options: Vec<String> = LayerMode::ALL
        .iter()
        .map(|mode| {
            let label = escape_html(mode.label());
            format!("      <option value=\"{}\">{}</option>", label, label)
        })
        .collect();

    INDEX_HTML
        .replace("{{TITLE}}", &escape_html(&map.title))
        .replace("{{ATTRIBUTION}}", &escape_html(&map.attribution))
        .replace("{{LAYER_OPTIONS}}", &layer_options.join("\n"))
        .replace("{{WIDTH}}", &map.width.to_string())
        .replace("{{HEIGHT}}", &map.height.to_string())
        .replace("{{ZOOM}}", &map.zoom_start.to_string())
        .replace("{{FALLBACK_LAT}}", &map.fallback_center[0].to_string())
        .replace("{{FALLBACK_LON}}", &map.fallback_center[1].to_string())
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
