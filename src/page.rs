//! Dashboard page renderer
//!
//! Assembles the single-page dashboard around the embedded map document:
//! static CSS, title, a mutually exclusive view selector, the legend for the
//! selected view, the map itself (or an explicit error card when there is
//! nothing to draw), three headline metrics and two top-5 ranked lists.
//!
//! The page embeds the deck.gl JSON produced by [`DeckGlWriter`] plus a small
//! script that instantiates the deck.gl runtime - the collaborator that
//! actually turns layer descriptors into pixels.

use crate::map::{distribution_map, flow_map};
use crate::reader::{ActivityData, LoadSource, RankedCity};
use crate::writer::{DeckGlWriter, Writer};
use crate::Result;

/// Which of the two mutually exclusive map views to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardView {
    Distribution,
    Flows,
}

impl DashboardView {
    /// Parse a `?view=` query value; anything unrecognized falls back to the
    /// distribution view.
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("flows") => DashboardView::Flows,
            _ => DashboardView::Distribution,
        }
    }

    pub fn as_query(&self) -> &'static str {
        match self {
            DashboardView::Distribution => "distribution",
            DashboardView::Flows => "flows",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DashboardView::Distribution => "Geographic Distribution",
            DashboardView::Flows => "Shipping Flows",
        }
    }
}

impl std::fmt::Display for DashboardView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Build the deck.gl JSON document for a view.
///
/// Returns `Ok(None)` for the flows view when the flow table is empty -
/// callers surface an error state rather than an empty map.
pub fn map_document(data: &ActivityData, view: DashboardView) -> Result<Option<String>> {
    let writer = DeckGlWriter::new();
    let frames = data.layer_data();
    match view {
        DashboardView::Distribution => {
            let spec = distribution_map(&data.customers, &data.sellers);
            writer.write(&spec, &frames).map(Some)
        }
        DashboardView::Flows => match flow_map(&data.flows) {
            Some(spec) => writer.write(&spec, &frames).map(Some),
            None => Ok(None),
        },
    }
}

/// Render the full dashboard HTML for one view.
pub fn render_page(data: &ActivityData, view: DashboardView, source: &LoadSource) -> Result<String> {
    let banner = match source {
        LoadSource::Files => String::new(),
        LoadSource::Demo { reason } => format!(
            "<div class=\"banner\">Demo data in use - {}</div>\n",
            escape_html(reason)
        ),
    };

    let map_section = match map_document(data, view)? {
        Some(doc) => format!(
            "<div id=\"map\"></div>\n\
             <script type=\"application/json\" id=\"map-spec\">{doc}</script>\n\
             <script>{MAP_RUNTIME_JS}</script>"
        ),
        None => format!(
            "<div class=\"error-box\">Unable to render the {} map: no data available.</div>",
            view.label().to_lowercase()
        ),
    };

    let total_customers = data.total_customers()?;
    let total_sellers = data.total_sellers()?;
    let primary_hub = data
        .busiest_city()?
        .map(|c| format!("{} ({})", c.city, c.state))
        .unwrap_or_else(|| "n/a".to_string());

    let top_customers = ranking_table("Top cities by customers", &data.top_by_customers(5)?);
    let top_sellers = ranking_table("Top cities by sellers", &data.top_by_sellers(5)?);

    Ok(format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\"/>\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"/>\n\
         <title>Brazil E-Commerce Activity Map</title>\n\
         <script src=\"https://unpkg.com/deck.gl@9.0.0/dist.min.js\"></script>\n\
         <script src=\"https://unpkg.com/maplibre-gl@4.1.1/dist/maplibre-gl.js\"></script>\n\
         <link href=\"https://unpkg.com/maplibre-gl@4.1.1/dist/maplibre-gl.css\" rel=\"stylesheet\"/>\n\
         <style>{css}</style>\n\
         </head>\n\
         <body>\n\
         <h1>Brazil E-Commerce Activity Map</h1>\n\
         <div class=\"subtitle\">Customer distribution, seller locations and shipping flows across Brazil</div>\n\
         {banner}\
         <div class=\"view-selector\">\n\
         <a href=\"?view=distribution\"{dist_active}>Geographic Distribution</a>\n\
         <a href=\"?view=flows\"{flows_active}>Shipping Flows</a>\n\
         </div>\n\
         {legend}\n\
         <h3>Interactive Map</h3>\n\
         {map_section}\n\
         <h2>Key Insights</h2>\n\
         <div class=\"metrics\">\n\
         <div class=\"metric\"><div class=\"metric-label\">Primary Hub</div><div class=\"metric-value\">{hub}</div></div>\n\
         <div class=\"metric\"><div class=\"metric-label\">Total Customers</div><div class=\"metric-value\">{customers}</div></div>\n\
         <div class=\"metric\"><div class=\"metric-label\">Total Sellers</div><div class=\"metric-value\">{sellers}</div></div>\n\
         </div>\n\
         <div class=\"rankings\">\n{top_customers}{top_sellers}</div>\n\
         <div class=\"footer\">Activity dashboard | rendered with deck.gl</div>\n\
         </body>\n\
         </html>\n",
        css = PAGE_CSS,
        banner = banner,
        dist_active = active_attr(view == DashboardView::Distribution),
        flows_active = active_attr(view == DashboardView::Flows),
        legend = legend_html(view),
        map_section = map_section,
        hub = escape_html(&primary_hub),
        customers = format_count(total_customers),
        sellers = format_count(total_sellers),
        top_customers = top_customers,
        top_sellers = top_sellers,
    ))
}

fn active_attr(active: bool) -> &'static str {
    if active {
        " class=\"active\""
    } else {
        ""
    }
}

fn legend_html(view: DashboardView) -> String {
    match view {
        DashboardView::Distribution => "<div class=\"legend-box\">\n\
             <h4>Geographic Distribution Legend</h4>\n\
             <p><span class=\"dot customer\"></span> <strong>Customers</strong> - customer locations by city</p>\n\
             <p><span class=\"dot seller\"></span> <strong>Sellers</strong> - seller locations by city</p>\n\
             <p><em>Size indicates relative volume</em></p>\n\
             </div>"
            .to_string(),
        DashboardView::Flows => "<div class=\"legend-box\">\n\
             <h4>Shipping Flows Legend</h4>\n\
             <p><span class=\"dot seller\"></span> <strong>Origin</strong> - seller locations</p>\n\
             <p><span class=\"dot customer\"></span> <strong>Destination</strong> - customer locations</p>\n\
             <p><em>Arcs show shipping connections</em></p>\n\
             </div>"
            .to_string(),
    }
}

fn ranking_table(title: &str, rows: &[RankedCity]) -> String {
    let mut body = String::new();
    for (i, row) in rows.iter().enumerate() {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"num\">{}</td></tr>\n",
            i + 1,
            escape_html(&row.city),
            escape_html(&row.state),
            format_count(row.count)
        ));
    }
    format!(
        "<table class=\"ranking\">\n\
         <caption>{title}</caption>\n\
         <thead><tr><th>#</th><th>City</th><th>State</th><th class=\"num\">Count</th></tr></thead>\n\
         <tbody>\n{body}</tbody>\n\
         </table>\n"
    )
}

/// Thousands-separated integer formatting for the metric cards.
fn format_count(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 {
        format!("-{out}")
    } else {
        out
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Static page styling; not data-dependent.
pub const PAGE_CSS: &str = r#"
@import url('https://fonts.googleapis.com/css2?family=Noto+Sans:wght@400;700&display=swap');

html, body {
    font-family: 'Noto Sans', sans-serif;
    background-color: #FFFFFF;
    margin: 0 auto;
    max-width: 1100px;
    padding: 0 1rem;
}
h1 {
    font-size: 2.5rem;
    font-weight: 700;
    color: #000000;
    text-align: center;
    padding-top: 2rem;
    margin-bottom: 0.5rem;
}
h2, h3 { color: #333D4B; font-weight: 700; }
.subtitle {
    text-align: center;
    color: #4E5968;
    font-size: 1.1rem;
    margin-bottom: 2rem;
}
.banner {
    background: #FFF7E6;
    border: 1px solid #FFD591;
    border-radius: 8px;
    padding: 0.75rem 1rem;
    margin: 0.5rem 0;
    color: #8C6D1F;
}
.view-selector a {
    display: inline-block;
    padding: 0.5rem 1rem;
    margin-right: 0.5rem;
    border: 1px solid #E9ECEF;
    border-radius: 8px;
    color: #4E5968;
    text-decoration: none;
    font-weight: 700;
}
.view-selector a.active {
    background: #3182F6;
    border-color: #3182F6;
    color: #FFFFFF;
}
.legend-box {
    background: #F8F9FA;
    border: 1px solid #E9ECEF;
    border-radius: 8px;
    padding: 1rem;
    margin: 0.5rem 0;
}
.dot {
    display: inline-block;
    width: 0.7rem;
    height: 0.7rem;
    border-radius: 50%;
    margin-right: 0.3rem;
}
.dot.customer { background: #3182F6; }
.dot.seller { background: #EF4444; }
#map {
    position: relative;
    height: 540px;
    border: 1px solid #E9ECEF;
    border-radius: 8px;
    overflow: hidden;
}
.error-box {
    background: #FFF1F0;
    border: 1px solid #FFA39E;
    border-radius: 8px;
    padding: 1rem;
    color: #A8071A;
}
.metrics { display: flex; gap: 1rem; }
.metric {
    flex: 1;
    background: #F8F9FA;
    border: 1px solid #E9ECEF;
    border-radius: 8px;
    padding: 1rem;
}
.metric-label { color: #4E5968; font-size: 0.875rem; }
.metric-value { font-size: 1.5rem; font-weight: 700; color: #000000; }
.rankings { display: flex; gap: 2rem; margin-top: 1rem; }
.ranking { flex: 1; border-collapse: collapse; }
.ranking caption { font-weight: 700; color: #333D4B; text-align: left; padding-bottom: 0.5rem; }
.ranking th, .ranking td { border-bottom: 1px solid #E9ECEF; padding: 0.4rem 0.6rem; text-align: left; }
.ranking .num { text-align: right; }
.footer {
    text-align: center;
    color: #808080;
    font-size: 0.875rem;
    padding: 2rem 0;
    border-top: 1px solid #E9ECEF;
    margin-top: 3rem;
}
"#;

/// In-page glue between the embedded map document and the deck.gl runtime.
/// Resolves `@@=[a, b]` accessor strings into row functions and dispatches
/// hover tooltips by layer id.
const MAP_RUNTIME_JS: &str = r#"
(function () {
    const spec = JSON.parse(document.getElementById('map-spec').textContent);
    const TYPES = { ScatterplotLayer: deck.ScatterplotLayer, ArcLayer: deck.ArcLayer };
    const accessorFrom = (expr) => {
        const cols = expr.slice(4, -1).split(',').map((s) => s.trim());
        return (d) => cols.map((c) => d[c]);
    };
    const tooltips = {};
    const layers = spec.layers.map((desc) => {
        const { ['@@type']: type, tooltip, ...props } = desc;
        tooltips[desc.id] = tooltip;
        const resolved = {};
        for (const [key, value] of Object.entries(props)) {
            resolved[key] =
                typeof value === 'string' && value.startsWith('@@=[') ? accessorFrom(value) : value;
        }
        return new TYPES[type](resolved);
    });
    new deck.DeckGL({
        container: 'map',
        map: typeof maplibregl !== 'undefined' ? maplibregl : undefined,
        mapStyle:
            spec.mapStyle === 'light'
                ? 'https://basemaps.cartocdn.com/gl/positron-gl-style/style.json'
                : spec.mapStyle,
        initialViewState: spec.initialViewState,
        controller: true,
        layers,
        getTooltip: (info) => {
            if (!info.layer || !info.object) return null;
            const tip = tooltips[info.layer.id];
            if (!tip) return null;
            const html = tip.html.replace(/\{(\w+)\}/g, (_, key) => {
                const value = info.object[key];
                return value == null ? '' : String(value);
            });
            return { html, style: tip.style };
        },
    });
})();
"#;
