//! This module contains all logic for loading assets (config, palette table, matcap image)
//! from external files and turning them into GPU resources.

use anyhow::Context;

use crate::data_structures::texture::Texture;

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("no window")?;
    let location = window.location();
    let origin = location
        .origin()
        .map_err(|e| anyhow::anyhow!("could not read the page origin: {:?}", e))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    #[cfg(target_arch = "wasm32")]
    let txt = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.error_for_status()?.text().await?
    };
    #[cfg(not(target_arch = "wasm32"))]
    let txt = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?
    };

    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?
    };

    Ok(data)
}

pub fn matcap_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("matcap_bind_group_layout"),
    })
}

/// The sphere material: one matcap texture and the bind group exposing it.
#[derive(Debug)]
pub struct Matcap {
    pub name: String,
    pub texture: Texture,
    pub bind_group: wgpu::BindGroup,
}

impl Matcap {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        texture: Texture,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let fallback;
        let sampler = match &texture.sampler {
            Some(sampler) => sampler,
            None => {
                fallback = crate::data_structures::texture::create_default_sampler(device);
                &fallback
            }
        };
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
            label: Some(name),
        });
        Self {
            name: name.to_string(),
            texture,
            bind_group,
        }
    }
}

/// Load the matcap image from `assets/`. A missing or undecodable file is not fatal: the
/// scene falls back to [`generate_matcap`].
pub async fn load_matcap(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> Matcap {
    let (name, img) = matcap_image(file_name, load_binary(file_name).await);
    let texture = Texture::from_image(device, queue, &img, Some(&name));
    Matcap::new(device, &name, texture, layout)
}

/// Decode the fetched matcap bytes, or generate one when fetching or decoding failed.
/// Returns the name the matcap is known by along with the image.
pub fn matcap_image(
    file_name: &str,
    bytes: anyhow::Result<Vec<u8>>,
) -> (String, image::DynamicImage) {
    let decoded = bytes.and_then(|bytes| {
        image::load_from_memory(&bytes).with_context(|| format!("could not decode {}", file_name))
    });
    match decoded {
        Ok(img) => {
            log::info!("Matcap {} loaded ({}x{})", file_name, img.width(), img.height());
            (file_name.to_string(), img)
        }
        Err(e) => {
            log::warn!("Matcap {} unavailable ({:#}), using a generated one", file_name, e);
            let img = image::DynamicImage::ImageRgba8(generate_matcap(GENERATED_MATCAP_SIZE));
            (GENERATED_MATCAP_NAME.to_string(), img)
        }
    }
}

pub const GENERATED_MATCAP_NAME: &str = "generated matcap";
pub const GENERATED_MATCAP_SIZE: u32 = 256;

/// A neutral studio matcap: a grey sphere lit from the upper left with a soft rim.
pub fn generate_matcap(size: u32) -> image::RgbaImage {
    let size = size.max(1);
    let half = size as f32 / 2.0;
    let light = {
        let (x, y, z) = (-0.4f32, 0.5f32, 0.77f32);
        let len = (x * x + y * y + z * z).sqrt();
        (x / len, y / len, z / len)
    };
    image::RgbaImage::from_fn(size, size, |px, py| {
        let x = (px as f32 + 0.5 - half) / half;
        // image rows grow downwards, normals grow upwards
        let y = (half - py as f32 - 0.5) / half;
        let r2 = x * x + y * y;
        if r2 > 1.0 {
            return image::Rgba([0, 0, 0, 255]);
        }
        let z = (1.0 - r2).sqrt();
        let diffuse = (x * light.0 + y * light.1 + z * light.2).max(0.0);
        // reflection of the view ray (0, 0, 1) about the normal, z component
        let specular = (2.0 * z * (x * light.0 + y * light.1 + z * light.2) - light.2)
            .max(0.0)
            .powf(24.0);
        let rim = (1.0 - z).powf(3.0) * 0.25;
        let value = (0.12 + 0.7 * diffuse + 0.5 * specular + rim).min(1.0);
        let c = (value * 255.0).round() as u8;
        image::Rgba([c, c, c, 255])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_matcap_has_the_requested_size() {
        let img = generate_matcap(64);
        assert_eq!(img.dimensions(), (64, 64));
        assert_eq!(generate_matcap(0).dimensions(), (1, 1));
    }

    #[test]
    fn generated_matcap_is_lit_from_the_upper_left() {
        let img = generate_matcap(128);
        let upper_left = img.get_pixel(44, 40)[0];
        let lower_right = img.get_pixel(84, 88)[0];
        assert!(upper_left > lower_right, "{} <= {}", upper_left, lower_right);
        // outside the disc
        assert_eq!(img.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn matcap_images_are_decoded() {
        let mut png = Vec::new();
        generate_matcap(32)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let (name, img) = matcap_image("studio.png", Ok(png));
        assert_eq!(name, "studio.png");
        assert_eq!((img.width(), img.height()), (32, 32));
    }

    #[test]
    fn unusable_matcaps_fall_back_to_a_generated_one() {
        let (name, img) = matcap_image("broken.jpg", Ok(b"not an image".to_vec()));
        assert_eq!(name, GENERATED_MATCAP_NAME);
        assert_eq!(img.width(), GENERATED_MATCAP_SIZE);

        let (name, _) = matcap_image("missing.jpg", Err(anyhow::anyhow!("no such file")));
        assert_eq!(name, GENERATED_MATCAP_NAME);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[tokio::test]
    async fn missing_assets_are_errors() {
        let err = load_string("does-not-exist.json").await.unwrap_err();
        assert!(format!("{:#}", err).contains("does-not-exist.json"));
        assert!(load_binary("does-not-exist.jpg").await.is_err());
    }
}
