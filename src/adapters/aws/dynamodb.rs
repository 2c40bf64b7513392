use crate::domain::jobs::VideoMetadataRecord;
use crate::ports::repository::VideoRepository;
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;
use std::error::Error;

type Item = HashMap<String, AttributeValue>;

/// DynamoAdapter implements VideoRepository for AWS DynamoDB.
/// The table's partition key is the string attribute `video_id`.
#[derive(Clone)]
pub struct DynamoAdapter {
    client: Client,
    table_name: String,
}

impl DynamoAdapter {
    pub fn new(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }
}

fn to_item(record: &VideoMetadataRecord) -> Item {
    let mut item = Item::new();
    let s = |v: &str| AttributeValue::S(v.to_string());
    let n = |v: String| AttributeValue::N(v);

    item.insert("video_id".into(), s(&record.video_id));
    item.insert("title".into(), s(&record.title));
    item.insert("description".into(), s(&record.description));
    item.insert("owner_id".into(), n(record.owner_id.to_string()));
    item.insert("category_id".into(), n(record.category_id.to_string()));
    item.insert("original_video_path".into(), s(&record.original_video_path));
    item.insert("manifest_url".into(), s(&record.manifest_url));
    item.insert("duration".into(), n(record.duration.to_string()));
    item.insert("file_format".into(), s(&record.file_format));
    item.insert("resolution".into(), s(&record.resolution));
    item.insert("file_size".into(), n(record.file_size.to_string()));
    item.insert("frame_rate".into(), s(&record.frame_rate));
    if let Some(thumbnail) = &record.thumbnail_path {
        item.insert("thumbnail_path".into(), s(thumbnail));
    }
    item
}

fn from_item(item: &Item) -> Result<VideoMetadataRecord, Box<dyn Error + Send + Sync>> {
    let string = |name: &str| -> Result<String, Box<dyn Error + Send + Sync>> {
        item.get(name)
            .and_then(|v| v.as_s().ok())
            .cloned()
            .ok_or_else(|| format!("item attribute {name} missing or not a string").into())
    };
    let number = |name: &str| -> Result<String, Box<dyn Error + Send + Sync>> {
        item.get(name)
            .and_then(|v| v.as_n().ok())
            .cloned()
            .ok_or_else(|| format!("item attribute {name} missing or not a number").into())
    };

    Ok(VideoMetadataRecord {
        video_id: string("video_id")?,
        title: string("title")?,
        description: string("description").unwrap_or_default(),
        owner_id: number("owner_id")?.parse()?,
        category_id: number("category_id")?.parse()?,
        original_video_path: string("original_video_path")?,
        manifest_url: string("manifest_url")?,
        duration: number("duration")?.parse()?,
        file_format: string("file_format")?,
        resolution: string("resolution")?,
        file_size: number("file_size")?.parse()?,
        frame_rate: string("frame_rate")?,
        thumbnail_path: string("thumbnail_path").ok(),
    })
}

#[async_trait]
impl VideoRepository for DynamoAdapter {
    async fn find_by_video_id(
        &self,
        video_id: &str,
    ) -> Result<Option<VideoMetadataRecord>, Box<dyn Error + Send + Sync>> {
        let resp = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("video_id", AttributeValue::S(video_id.to_string()))
            .consistent_read(true)
            .send()
            .await?;

        resp.item.as_ref().map(from_item).transpose()
    }

    async fn insert_if_absent(
        &self,
        record: &VideoMetadataRecord,
    ) -> Result<bool, Box<dyn Error + Send + Sync>> {
        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_item(record)))
            .condition_expression("attribute_not_exists(video_id)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_conditional_check_failed_exception() {
                    Ok(false)
                } else {
                    Err(service_error.into())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(thumbnail: Option<&str>) -> VideoMetadataRecord {
        VideoMetadataRecord {
            video_id: "42".into(),
            title: "Clip".into(),
            description: String::new(),
            owner_id: 7,
            category_id: 3,
            original_video_path: "https://cdn.example.com/raw/clip.mp4".into(),
            manifest_url: "https://cdn.example.com/uploads/videos/video_42/master.m3u8".into(),
            duration: 12.5,
            file_format: "mov,mp4,m4a,3gp,3g2,mj2".into(),
            resolution: "1920x1080".into(),
            file_size: 1_048_576,
            frame_rate: "30000/1001".into(),
            thumbnail_path: thumbnail.map(str::to_string),
        }
    }

    #[test]
    fn test_item_mapping() {
        let original = record(Some("https://cdn.example.com/uploads/videos/video_42/thumbnail.jpg"));
        let item = to_item(&original);
        assert_eq!(item.get("owner_id"), Some(&AttributeValue::N("7".into())));
        assert_eq!(
            item.get("frame_rate"),
            Some(&AttributeValue::S("30000/1001".into()))
        );
        assert_eq!(from_item(&item).unwrap(), original);
    }

    #[test]
    fn test_missing_thumbnail_is_omitted() {
        let item = to_item(&record(None));
        assert!(!item.contains_key("thumbnail_path"));
        assert_eq!(from_item(&item).unwrap().thumbnail_path, None);
    }

    #[test]
    fn test_incomplete_item_is_an_error() {
        let mut item = to_item(&record(None));
        item.remove("manifest_url");
        assert!(from_item(&item).is_err());
    }
}
