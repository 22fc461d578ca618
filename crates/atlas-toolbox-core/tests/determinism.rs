use atlas_toolbox_core::prelude::*;
use image::{Rgba, RgbaImage};
use rand::{Rng, SeedableRng, rngs::StdRng};

#[test]
fn repeated_layouts_are_identical() {
    let mut rng = StdRng::seed_from_u64(2024);
    let inputs: Vec<(String, u32, u32)> = (0..70)
        .map(|i| (format!("k{i}"), rng.gen_range(2..64), rng.gen_range(2..64)))
        .collect();
    for packer in [PackerKind::Automatic]
        .into_iter()
        .chain(PackerKind::REGISTRY_ORDER)
    {
        let cfg = AtlasConfig::builder().packer(packer).build();
        let a = pack_layout(inputs.clone(), &cfg).expect("first");
        let b = pack_layout(inputs.clone(), &cfg).expect("second");
        assert_eq!(a.pages, b.pages, "{packer}");
        assert_eq!(a.result.attempted_sizes, b.result.attempted_sizes, "{packer}");
        assert_eq!(a.result.strategy, b.result.strategy, "{packer}");
    }
}

#[test]
fn repeated_builds_produce_the_same_pixels() {
    let mut rng = StdRng::seed_from_u64(77);
    let sprites: Vec<Sprite> = (0..24)
        .map(|i| {
            let (w, h) = (rng.gen_range(3..20), rng.gen_range(3..20));
            let img = RgbaImage::from_fn(w, h, |x, y| Rgba([(x * 13) as u8, (y * 7) as u8, i as u8, 255]));
            Sprite::new(format!("s{i}"), img)
        })
        .collect();
    let cfg = AtlasConfig::builder().detect_flips(true).build();
    let builder = AtlasBuilder::new(cfg);
    let a = builder.build(&sprites).expect("first");
    let b = builder.build(&sprites).expect("second");
    assert_eq!(a.pages.len(), b.pages.len());
    for (pa, pb) in a.pages.iter().zip(&b.pages) {
        assert_eq!(pa.rgba, pb.rgba);
        assert_eq!(pa.records, pb.records);
    }
}
