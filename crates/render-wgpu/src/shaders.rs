/// Entry point of [`TRACE_SHADER`].
pub const TRACE_ENTRY: &str = "trace_main";

/// Workgroup edge length; must match `@workgroup_size` below.
pub const WORKGROUP_SIZE: u32 = 8;

/// WGSL compute shader: one primary ray per pixel, Lambert shading with hard
/// shadows, mirror bounces weighted by shininess.
pub const TRACE_SHADER: &str = r#"
struct Params {
    eye: vec3<f32>,
    half_w: f32,
    forward: vec3<f32>,
    half_h: f32,
    right: vec3<f32>,
    ambient_intensity: f32,
    up: vec3<f32>,
    bounce_limit: i32,
    ambient: u32,
    width: u32,
    height: u32,
    sphere_count: u32,
    plane_count: u32,
    light_count: u32,
    _pad0: u32,
    _pad1: u32,
};

struct Sphere {
    center: vec3<f32>,
    radius: f32,
    color: u32,
    shininess: f32,
};

struct Plane {
    point: vec3<f32>,
    shininess: f32,
    normal: vec3<f32>,
    color: u32,
};

struct Light {
    position: vec3<f32>,
    intensity: f32,
    color: u32,
};

struct Hit {
    t: f32,
    point: vec3<f32>,
    normal: vec3<f32>,
    color: vec3<f32>,
    shininess: f32,
};

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var<storage, read> spheres: array<Sphere>;
@group(0) @binding(2) var<storage, read> planes: array<Plane>;
@group(0) @binding(3) var<storage, read> lights: array<Light>;
@group(0) @binding(4) var<storage, read_write> pixels: array<u32>;

const T_MIN: f32 = 1e-3;
const SURFACE_BIAS: f32 = 1e-2;
const NO_HIT: f32 = 3.0e38;

fn unpack_color(c: u32) -> vec3<f32> {
    return vec3<f32>(
        f32((c >> 16u) & 0xffu),
        f32((c >> 8u) & 0xffu),
        f32(c & 0xffu),
    ) / 255.0;
}

fn pack_color(rgb: vec3<f32>) -> u32 {
    let c = vec3<u32>(round(clamp(rgb, vec3<f32>(0.0), vec3<f32>(1.0)) * 255.0));
    return (c.x << 16u) | (c.y << 8u) | c.z;
}

fn facing(n: vec3<f32>, dir: vec3<f32>) -> vec3<f32> {
    if (dot(n, dir) > 0.0) {
        return -n;
    }
    return n;
}

fn intersect_sphere(s: Sphere, origin: vec3<f32>, dir: vec3<f32>) -> f32 {
    let oc = origin - s.center;
    let b = dot(oc, dir);
    let c = dot(oc, oc) - s.radius * s.radius;
    let disc = b * b - c;
    if (disc < 0.0) {
        return NO_HIT;
    }
    let root = sqrt(disc);
    let near = -b - root;
    if (near > T_MIN) {
        return near;
    }
    let far = -b + root;
    if (far > T_MIN) {
        return far;
    }
    return NO_HIT;
}

fn intersect_plane(p: Plane, origin: vec3<f32>, dir: vec3<f32>) -> f32 {
    let n = normalize(p.normal);
    let denom = dot(n, dir);
    if (abs(denom) < 1e-6) {
        return NO_HIT;
    }
    let t = dot(p.point - origin, n) / denom;
    if (t > T_MIN) {
        return t;
    }
    return NO_HIT;
}

fn nearest_hit(origin: vec3<f32>, dir: vec3<f32>) -> Hit {
    var hit: Hit;
    hit.t = NO_HIT;
    for (var i = 0u; i < params.sphere_count; i++) {
        let s = spheres[i];
        let t = intersect_sphere(s, origin, dir);
        if (t < hit.t) {
            hit.t = t;
            hit.point = origin + dir * t;
            hit.normal = facing((hit.point - s.center) / s.radius, dir);
            hit.color = unpack_color(s.color);
            hit.shininess = s.shininess;
        }
    }
    for (var i = 0u; i < params.plane_count; i++) {
        let p = planes[i];
        let t = intersect_plane(p, origin, dir);
        if (t < hit.t) {
            hit.t = t;
            hit.point = origin + dir * t;
            hit.normal = facing(normalize(p.normal), dir);
            hit.color = unpack_color(p.color);
            hit.shininess = p.shininess;
        }
    }
    return hit;
}

fn shade(hit: Hit, ambient: vec3<f32>) -> vec3<f32> {
    var light_sum = ambient;
    let origin = hit.point + hit.normal * SURFACE_BIAS;
    for (var i = 0u; i < params.light_count; i++) {
        let light = lights[i];
        let to_light = light.position - origin;
        let distance = length(to_light);
        let l = to_light / distance;
        let lambert = dot(hit.normal, l);
        if (lambert <= 0.0) {
            continue;
        }
        let blocker = nearest_hit(origin, l);
        if (blocker.t < distance) {
            continue;
        }
        light_sum += unpack_color(light.color) * (light.intensity * lambert);
    }
    return hit.color * light_sum;
}

@compute @workgroup_size(8, 8)
fn trace_main(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x >= params.width || id.y >= params.height) {
        return;
    }
    let ndc_x = (f32(id.x) + 0.5) / f32(params.width) * 2.0 - 1.0;
    let ndc_y = 1.0 - (f32(id.y) + 0.5) / f32(params.height) * 2.0;

    var origin = params.eye;
    var dir = normalize(
        params.forward
        + params.right * (ndc_x * params.half_w)
        + params.up * (ndc_y * params.half_h)
    );
    let ambient = unpack_color(params.ambient) * params.ambient_intensity;

    var color = vec3<f32>(0.0);
    var weight: f32 = 1.0;
    for (var bounce = 0; bounce <= params.bounce_limit; bounce++) {
        let hit = nearest_hit(origin, dir);
        if (hit.t >= NO_HIT) {
            color += ambient * weight;
            break;
        }
        color += shade(hit, ambient) * (weight * (1.0 - hit.shininess));
        weight *= hit.shininess;
        if (weight <= 0.0) {
            break;
        }
        dir = normalize(dir - hit.normal * (2.0 * dot(dir, hit.normal)));
        origin = hit.point + hit.normal * SURFACE_BIAS;
    }

    pixels[id.y * params.width + id.x] = pack_color(color);
}
"#;

/// WGSL blit: a fullscreen triangle sampling the uploaded frame texture.
pub const BLIT_SHADER: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(0) @binding(0) var frame_texture: texture_2d<f32>;
@group(0) @binding(1) var frame_sampler: sampler;

@vertex
fn vs_blit(@builtin(vertex_index) index: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: VertexOutput;
    out.clip_position = vec4<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, 0.0, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_blit(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(textureSample(frame_texture, frame_sampler, in.uv).rgb, 1.0);
}
"#;
