//! Tag registries: immutable tables mapping a numeric tag id to a display
//! name and a decode behavior, one table per directory scope.
//!
//! See:
//! - <http://www.awaresystems.be/imaging/tiff/tifftags/baseline.html>
//! - <http://www.awaresystems.be/imaging/tiff/tifftags/extension.html>
//! - <http://www.awaresystems.be/imaging/tiff/tifftags/private.html>
//! - <https://exiftool.org/TagNames/EXIF.html>

use std::{
    collections::HashMap,
    fmt::Display,
    sync::{Arc, OnceLock},
};

#[cfg(feature = "json_dump")]
use serde::Serialize;

/// Directory scope a tag id is interpreted in.
#[cfg_attr(feature = "json_dump", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Baseline, extension and private TIFF tags (IFD0, IFD1, ...).
    Root,
    /// Exif private IFD.
    Exif,
    /// GPS private IFD.
    Gps,
    /// Interoperability private IFD.
    Interop,
}

impl Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Scope::Root => "root",
            Scope::Exif => "exif",
            Scope::Gps => "gps",
            Scope::Interop => "interop",
        };
        f.write_str(s)
    }
}

/// What the IFD walker does with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagBehavior {
    /// Decode the entry value according to its data format.
    Decode,
    /// The entry value is the address of a sub-directory, walk it with the
    /// given scope as overlay.
    RecurseInto(Scope),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagDescriptor {
    pub name: &'static str,
    pub behavior: TagBehavior,
}

impl TagDescriptor {
    pub const fn decode(name: &'static str) -> Self {
        Self {
            name,
            behavior: TagBehavior::Decode,
        }
    }

    pub const fn recurse(name: &'static str, scope: Scope) -> Self {
        Self {
            name,
            behavior: TagBehavior::RecurseInto(scope),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TagRegistry {
    scope: Scope,
    tags: HashMap<u16, TagDescriptor>,
}

impl TagRegistry {
    fn from_table(scope: Scope, names: &[(u16, &'static str)], pointers: &[(u16, TagDescriptor)]) -> Self {
        let mut tags: HashMap<u16, TagDescriptor> = names
            .iter()
            .map(|(id, name)| (*id, TagDescriptor::decode(name)))
            .collect();
        tags.extend(pointers.iter().copied());
        Self { scope, tags }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn get(&self, id: u16) -> Option<&TagDescriptor> {
        self.tags.get(&id)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// The full set of registries a parse consults.
///
/// Use [`TagRegistries::shared`] for the standard tables, built once and
/// shared between parsers, or [`TagRegistries::standard`] for an owned copy
/// that can be extended with [`TagRegistries::insert`] before it is handed to
/// a [`MetadataParser`](crate::MetadataParser).
#[derive(Debug, Clone)]
pub struct TagRegistries {
    root: TagRegistry,
    exif: TagRegistry,
    gps: TagRegistry,
    interop: TagRegistry,
}

impl TagRegistries {
    pub fn standard() -> Self {
        Self {
            root: TagRegistry::from_table(
                Scope::Root,
                ROOT_TAGS,
                &[
                    (EXIF_IFD_POINTER, TagDescriptor::recurse("ExifOffset", Scope::Exif)),
                    (GPS_IFD_POINTER, TagDescriptor::recurse("GPSInfo", Scope::Gps)),
                    (
                        INTEROP_IFD_POINTER,
                        TagDescriptor::recurse("InteropOffset", Scope::Interop),
                    ),
                ],
            ),
            exif: TagRegistry::from_table(
                Scope::Exif,
                EXIF_TAGS,
                &[(
                    INTEROP_IFD_POINTER,
                    TagDescriptor::recurse("InteropOffset", Scope::Interop),
                )],
            ),
            gps: TagRegistry::from_table(Scope::Gps, GPS_TAGS, &[]),
            interop: TagRegistry::from_table(Scope::Interop, INTEROP_TAGS, &[]),
        }
    }

    /// The standard registries, built on first use.
    pub fn shared() -> Arc<TagRegistries> {
        static SHARED: OnceLock<Arc<TagRegistries>> = OnceLock::new();
        SHARED
            .get_or_init(|| Arc::new(TagRegistries::standard()))
            .clone()
    }

    pub fn registry(&self, scope: Scope) -> &TagRegistry {
        match scope {
            Scope::Root => &self.root,
            Scope::Exif => &self.exif,
            Scope::Gps => &self.gps,
            Scope::Interop => &self.interop,
        }
    }

    /// Add or replace a descriptor, returning the previous one.
    pub fn insert(&mut self, scope: Scope, id: u16, descriptor: TagDescriptor) -> Option<TagDescriptor> {
        let registry = match scope {
            Scope::Root => &mut self.root,
            Scope::Exif => &mut self.exif,
            Scope::Gps => &mut self.gps,
            Scope::Interop => &mut self.interop,
        };
        registry.tags.insert(id, descriptor)
    }

    /// Resolve `id` in the overlay scope first (if any), then in the root
    /// scope. The first scope that knows the id wins.
    pub fn lookup(&self, id: u16, overlay: Option<Scope>) -> Option<(Scope, &TagDescriptor)> {
        overlay
            .into_iter()
            .chain(std::iter::once(Scope::Root))
            .find_map(|scope| self.registry(scope).get(id).map(|d| (scope, d)))
    }
}

pub(crate) const EXIF_IFD_POINTER: u16 = 0x8769;
pub(crate) const GPS_IFD_POINTER: u16 = 0x8825;
pub(crate) const INTEROP_IFD_POINTER: u16 = 0xa005;

const ROOT_TAGS: &[(u16, &str)] = &[
    // baseline
    (0x00fe, "NewSubfileType"),
    (0x00ff, "SubfileType"),
    (0x0100, "ImageWidth"),
    (0x0101, "ImageLength"),
    (0x0102, "BitsPerSample"),
    (0x0103, "Compression"),
    (0x0106, "PhotometricInterpretation"),
    (0x0107, "Threshholding"),
    (0x0108, "CellWidth"),
    (0x0109, "CellLength"),
    (0x010a, "FillOrder"),
    (0x010e, "ImageDescription"),
    (0x010f, "Make"),
    (0x0110, "Model"),
    (0x0111, "StripOffsets"),
    (0x0112, "Orientation"),
    (0x0115, "SamplesPerPixel"),
    (0x0116, "RowsPerStrip"),
    (0x0117, "StripByteCounts"),
    (0x0118, "MinSampleValue"),
    (0x0119, "MaxSampleValue"),
    (0x011a, "XResolution"),
    (0x011b, "YResolution"),
    (0x011c, "PlanarConfiguration"),
    (0x0120, "FreeOffsets"),
    (0x0121, "FreeByteCounts"),
    (0x0122, "GrayResponseUnit"),
    (0x0123, "GrayResponseCurve"),
    (0x0128, "ResolutionUnit"),
    (0x0131, "Software"),
    (0x0132, "DateTime"),
    (0x013b, "Artist"),
    (0x013c, "HostComputer"),
    (0x0140, "ColorMap"),
    (0x0152, "ExtraSamples"),
    (0x8298, "Copyright"),
    // extension
    (0x010d, "DocumentName"),
    (0x011d, "PageName"),
    (0x011e, "XPosition"),
    (0x011f, "YPosition"),
    (0x0124, "T4Options"),
    (0x0125, "T6Options"),
    (0x0129, "PageNumber"),
    (0x012d, "TransferFunction"),
    (0x013d, "Predictor"),
    (0x013e, "WhitePoint"),
    (0x013f, "PrimaryChromaticities"),
    (0x0141, "HalftoneHints"),
    (0x0142, "TileWidth"),
    (0x0143, "TileLength"),
    (0x0144, "TileOffsets"),
    (0x0145, "TileByteCounts"),
    (0x0146, "BadFaxLines"),
    (0x0147, "CleanFaxData"),
    (0x0148, "ConsecutiveBadFaxLines"),
    (0x014a, "SubIFDs"),
    (0x014c, "InkSet"),
    (0x014d, "InkNames"),
    (0x014e, "NumberOfInks"),
    (0x0150, "DotRange"),
    (0x0151, "TargetPrinter"),
    (0x0153, "SampleFormat"),
    (0x0154, "SMinSampleValue"),
    (0x0155, "SMaxSampleValue"),
    (0x0156, "TransferRange"),
    (0x0157, "ClipPath"),
    (0x0158, "XClipPathUnits"),
    (0x0159, "YClipPathUnits"),
    (0x015a, "Indexed"),
    (0x015b, "JPEGTables"),
    (0x015f, "OPIProxy"),
    (0x0190, "GlobalParametersIFD"),
    (0x0191, "ProfileType"),
    (0x0192, "FaxProfile"),
    (0x0193, "CodingMethods"),
    (0x0194, "VersionYear"),
    (0x0195, "ModeNumber"),
    (0x01b1, "Decode"),
    (0x01b2, "DefaultImageColor"),
    (0x0200, "JPEGProc"),
    (0x0201, "JPEGInterchangeFormat"),
    (0x0202, "JPEGInterchangeFormatLength"),
    (0x0203, "JPEGRestartInterval"),
    (0x0205, "JPEGLosslessPredictors"),
    (0x0206, "JPEGPointTransforms"),
    (0x0207, "JPEGQTables"),
    (0x0208, "JPEGDCTables"),
    (0x0209, "JPEGACTables"),
    (0x0211, "YCbCrCoefficients"),
    (0x0212, "YCbCrSubSampling"),
    (0x0213, "YCbCrPositioning"),
    (0x0214, "ReferenceBlackWhite"),
    (0x022f, "StripRowCounts"),
    (0x02bc, "XMP"),
    (0x800d, "ImageID"),
    (0x87ac, "ImageLayer"),
    // private
    (0x80a4, "WangAnnotation"),
    (0x82a5, "MDFileTag"),
    (0x82a6, "MDScalePixel"),
    (0x82a7, "MDColorTable"),
    (0x82a8, "MDLabName"),
    (0x82a9, "MDSampleInfo"),
    (0x82aa, "MDPrepDate"),
    (0x82ab, "MDPrepTime"),
    (0x82ac, "MDFileUnits"),
    (0x830e, "ModelPixelScaleTag"),
    (0x83bb, "IPTC"),
    (0x847e, "INGRPacketDataTag"),
    (0x847f, "INGRFlagRegisters"),
    (0x8480, "IrasBTransformationMatrix"),
    (0x8482, "ModelTiepointTag"),
    (0x85d8, "ModelTransformationTag"),
    (0x8649, "Photoshop"),
    (0x8773, "ICCProfile"),
    (0x87af, "GeoKeyDirectoryTag"),
    (0x87b0, "GeoDoubleParamsTag"),
    (0x87b1, "GeoAsciiParamsTag"),
    (0x885c, "HylaFAXFaxRecvParams"),
    (0x885d, "HylaFAXFaxSubAddress"),
    (0x885e, "HylaFAXFaxRecvTime"),
    (0x935c, "ImageSourceData"),
    (0xa480, "GDALMetadata"),
    (0xa481, "GDALNoData"),
    (0xc427, "OceScanjobDescription"),
    (0xc428, "OceApplicationSelector"),
    (0xc429, "OceIdentificationNumber"),
    (0xc42a, "OceImageLogicCharacteristics"),
    (0xc612, "DNGVersion"),
    (0xc613, "DNGBackwardVersion"),
    (0xc614, "UniqueCameraModel"),
    (0xc615, "LocalizedCameraModel"),
    (0xc616, "CFAPlaneColor"),
    (0xc617, "CFALayout"),
    (0xc618, "LinearizationTable"),
    (0xc619, "BlackLevelRepeatDim"),
    (0xc61a, "BlackLevel"),
    (0xc61b, "BlackLevelDeltaH"),
    (0xc61c, "BlackLevelDeltaV"),
    (0xc61d, "WhiteLevel"),
    (0xc61e, "DefaultScale"),
    (0xc61f, "DefaultCropOrigin"),
    (0xc620, "DefaultCropSize"),
    (0xc621, "ColorMatrix1"),
    (0xc622, "ColorMatrix2"),
    (0xc623, "CameraCalibration1"),
    (0xc624, "CameraCalibration2"),
    (0xc625, "ReductionMatrix1"),
    (0xc626, "ReductionMatrix2"),
    (0xc627, "AnalogBalance"),
    (0xc628, "AsShotNeutral"),
    (0xc629, "AsShotWhiteXY"),
    (0xc62a, "BaselineExposure"),
    (0xc62b, "BaselineNoise"),
    (0xc62c, "BaselineSharpness"),
    (0xc62d, "BayerGreenSplit"),
    (0xc62e, "LinearResponseLimit"),
    (0xc62f, "CameraSerialNumber"),
    (0xc630, "LensInfo"),
    (0xc631, "ChromaBlurRadius"),
    (0xc632, "AntiAliasStrength"),
    (0xc634, "DNGPrivateData"),
    (0xc635, "MakerNoteSafety"),
    (0xc65a, "CalibrationIlluminant1"),
    (0xc65b, "CalibrationIlluminant2"),
    (0xc65c, "BestQualityScale"),
    (0xc660, "AliasLayerMetadata"),
];

const EXIF_TAGS: &[(u16, &str)] = &[
    (0x829a, "ExposureTime"),
    (0x829d, "FNumber"),
    (0x8822, "ExposureProgram"),
    (0x8824, "SpectralSensitivity"),
    (0x8827, "ISOSpeedRatings"),
    (0x8828, "OECF"),
    (0x8830, "SensitivityType"),
    (0x8831, "StandardOutputSensitivity"),
    (0x8832, "RecommendedExposureIndex"),
    (0x9000, "ExifVersion"),
    (0x9003, "DateTimeOriginal"),
    (0x9004, "DateTimeDigitized"),
    (0x9010, "OffsetTime"),
    (0x9011, "OffsetTimeOriginal"),
    (0x9012, "OffsetTimeDigitized"),
    (0x9101, "ComponentsConfiguration"),
    (0x9102, "CompressedBitsPerPixel"),
    (0x9201, "ShutterSpeedValue"),
    (0x9202, "ApertureValue"),
    (0x9203, "BrightnessValue"),
    (0x9204, "ExposureBiasValue"),
    (0x9205, "MaxApertureValue"),
    (0x9206, "SubjectDistance"),
    (0x9207, "MeteringMode"),
    (0x9208, "LightSource"),
    (0x9209, "Flash"),
    (0x920a, "FocalLength"),
    (0x9214, "SubjectArea"),
    (0x927c, "MakerNote"),
    (0x9286, "UserComment"),
    (0x9290, "SubsecTime"),
    (0x9291, "SubsecTimeOriginal"),
    (0x9292, "SubsecTimeDigitized"),
    (0xa000, "FlashpixVersion"),
    (0xa001, "ColorSpace"),
    (0xa002, "PixelXDimension"),
    (0xa003, "PixelYDimension"),
    (0xa004, "RelatedSoundFile"),
    (0xa20b, "FlashEnergy"),
    (0xa20c, "SpatialFrequencyResponse"),
    (0xa20e, "FocalPlaneXResolution"),
    (0xa20f, "FocalPlaneYResolution"),
    (0xa210, "FocalPlaneResolutionUnit"),
    (0xa214, "SubjectLocation"),
    (0xa215, "ExposureIndex"),
    (0xa217, "SensingMethod"),
    (0xa300, "FileSource"),
    (0xa301, "SceneType"),
    (0xa302, "CFAPattern"),
    (0xa401, "CustomRendered"),
    (0xa402, "ExposureMode"),
    (0xa403, "WhiteBalance"),
    (0xa404, "DigitalZoomRatio"),
    (0xa405, "FocalLengthIn35mmFilm"),
    (0xa406, "SceneCaptureType"),
    (0xa407, "GainControl"),
    (0xa408, "Contrast"),
    (0xa409, "Saturation"),
    (0xa40a, "Sharpness"),
    (0xa40b, "DeviceSettingDescription"),
    (0xa40c, "SubjectDistanceRange"),
    (0xa420, "ImageUniqueID"),
    (0xa430, "CameraOwnerName"),
    (0xa431, "BodySerialNumber"),
    (0xa432, "LensSpecification"),
    (0xa433, "LensMake"),
    (0xa434, "LensModel"),
    (0xa435, "LensSerialNumber"),
    (0xa500, "Gamma"),
];

const GPS_TAGS: &[(u16, &str)] = &[
    (0x0000, "GPSVersionID"),
    (0x0001, "GPSLatitudeRef"),
    (0x0002, "GPSLatitude"),
    (0x0003, "GPSLongitudeRef"),
    (0x0004, "GPSLongitude"),
    (0x0005, "GPSAltitudeRef"),
    (0x0006, "GPSAltitude"),
    (0x0007, "GPSTimeStamp"),
    (0x0008, "GPSSatellites"),
    (0x0009, "GPSStatus"),
    (0x000a, "GPSMeasureMode"),
    (0x000b, "GPSDOP"),
    (0x000c, "GPSSpeedRef"),
    (0x000d, "GPSSpeed"),
    (0x000e, "GPSTrackRef"),
    (0x000f, "GPSTrack"),
    (0x0010, "GPSImgDirectionRef"),
    (0x0011, "GPSImgDirection"),
    (0x0012, "GPSMapDatum"),
    (0x0013, "GPSDestLatitudeRef"),
    (0x0014, "GPSDestLatitude"),
    (0x0015, "GPSDestLongitudeRef"),
    (0x0016, "GPSDestLongitude"),
    (0x0017, "GPSDestBearingRef"),
    (0x0018, "GPSDestBearing"),
    (0x0019, "GPSDestDistanceRef"),
    (0x001a, "GPSDestDistance"),
    (0x001b, "GPSProcessingMethod"),
    (0x001c, "GPSAreaInformation"),
    (0x001d, "GPSDateStamp"),
    (0x001e, "GPSDifferential"),
    (0x001f, "GPSHPositioningError"),
];

const INTEROP_TAGS: &[(u16, &str)] = &[
    (0x0001, "InteroperabilityIndex"),
    (0x0002, "InteroperabilityVersion"),
    (0x1000, "RelatedImageFileFormat"),
    (0x1001, "RelatedImageWidth"),
    (0x1002, "RelatedImageLength"),
];
