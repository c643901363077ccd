use serde::{Deserialize, Serialize};

/// Resource returned by the album assets listing (`.../albums/{id}/assets?embed=asset`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlbumAsset {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<Asset>,
}

impl AlbumAsset {
    /// Id of the underlying asset, falling back to the album-asset id when not embedded.
    pub fn asset_id(&self) -> &str {
        self.asset
            .as_ref()
            .map(|a| a.id.as_str())
            .unwrap_or(self.id.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Asset {
    pub id: String,

    /// `image` or `video`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,

    #[serde(default)]
    pub payload: AssetPayload,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPayload {
    /// Local capture time without offset, e.g. `2021-07-04T18:22:10`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_source: Option<ImportSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xmp: Option<Xmp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<AssetLocation>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_height: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Xmp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dc: Option<XmpDc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiff: Option<XmpTiff>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aux: Option<XmpAux>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct XmpDc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct XmpTiff {
    #[serde(rename = "Make", default, skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,

    #[serde(rename = "Model", default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct XmpAux {
    #[serde(rename = "Lens", default, skip_serializing_if = "Option::is_none")]
    pub lens: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AssetLocation {
    pub latitude: f64,
    pub longitude: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_embedded_asset_metadata() {
        let resource: AlbumAsset = serde_json::from_value(json!({
            "id": "aa-1",
            "asset": {
                "id": "asset-1",
                "subtype": "image",
                "payload": {
                    "captureDate": "2021-07-04T18:22:10",
                    "importSource": { "fileName": "DSC_0042.NEF", "originalWidth": 6000, "originalHeight": 4000 },
                    "xmp": {
                        "dc": { "title": "Harbour at dusk" },
                        "tiff": { "Make": "NIKON CORPORATION", "Model": "NIKON Z 6" },
                        "aux": { "Lens": "NIKKOR Z 24-70mm f/4 S" }
                    },
                    "location": { "latitude": 43.3, "longitude": 5.37, "city": "Marseille" }
                }
            }
        }))
        .unwrap();

        assert_eq!(resource.asset_id(), "asset-1");
        let payload = &resource.asset.as_ref().unwrap().payload;
        assert_eq!(payload.capture_date.as_deref(), Some("2021-07-04T18:22:10"));
        let tiff = payload.xmp.as_ref().and_then(|x| x.tiff.as_ref()).unwrap();
        assert_eq!(tiff.model.as_deref(), Some("NIKON Z 6"));
        assert_eq!(
            payload.import_source.as_ref().and_then(|s| s.original_width),
            Some(6000)
        );
    }

    #[test]
    fn asset_id_falls_back_to_resource_id() {
        let resource: AlbumAsset = serde_json::from_value(json!({ "id": "bare" })).unwrap();
        assert_eq!(resource.asset_id(), "bare");
    }
}
